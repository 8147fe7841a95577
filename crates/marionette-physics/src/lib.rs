//! # Marionette Physics
//!
//! The query-side contract against the physics scene. The scene itself is
//! owned elsewhere; IK only needs a ground-probing oracle (raycasts, shape
//! sweeps, overlap tests).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod collision;
pub mod scene;

pub use collision::{RaycastHit, Shape};
pub use scene::{FlatGround, PhysicsScene};
