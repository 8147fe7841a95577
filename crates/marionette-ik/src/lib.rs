//! # Marionette IK
//!
//! Real-time inverse kinematics for humanoid skeletons.
//!
//! Each frame the animation pipeline hands over a skeleton snapshot; the
//! [`IkManager`] picks end-effector targets (fixed offsets or physics
//! ground probes), runs one of two solvers over a working copy, restores
//! any stable world rotations, and writes the result back:
//!
//! - [`TwoBoneSolver`](solver::TwoBoneSolver): closed-form solution for
//!   three-joint chains (shoulder-elbow-hand, hip-knee-foot).
//! - [`XpbdSolver`](solver::XpbdSolver): position-based dynamics over all
//!   bones with compliant length constraints, virtual directional forces,
//!   and a rotation-recovery pass.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod manager;
pub mod node;
pub mod skeleton;
pub mod solver;

pub use config::{DirectionForceConfig, EffectorConfig, EffectorMode, IkConfig, SolverKind};
pub use manager::IkManager;
pub use node::{IkBone, TransformSpace};
pub use skeleton::IkSkeleton;
pub use solver::{EffectorTargets, Solver, TwoBoneSolver, XpbdSolver};
