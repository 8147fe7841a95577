//! # Marionette Anim
//!
//! The skeleton snapshot contract shared with the forward-animation
//! pipeline. The IK side consumes a read-only snapshot of these records and
//! writes its results back into them.
//!
//! Conventions: positions in meters, rotations as unit quaternions, Z-up
//! right-handed world.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod skeleton;

pub use skeleton::{find_by_id, Bone, Skeleton, NO_PARENT};
