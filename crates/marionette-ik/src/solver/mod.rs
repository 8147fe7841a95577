//! IK solver strategies
//!
//! Both solvers share one entry point: `solve(config, effectors, skeleton,
//! root_displacement)`. Dispatch is a sum type; there is no deeper
//! hierarchy to inherit from.

pub mod two_bone;
pub mod xpbd;

use crate::config::{IkConfig, SolverKind};
use crate::skeleton::IkSkeleton;
use glam::Vec3;
use std::collections::BTreeMap;

pub use two_bone::TwoBoneSolver;
pub use xpbd::XpbdSolver;

/// End-effector targets keyed by bone name.
///
/// An ordered map: solvers iterate it directly, and the projection order
/// must be deterministic across frames.
pub type EffectorTargets = BTreeMap<String, Vec3>;

/// A solver strategy instance.
///
/// Holding the instance between frames lets the XPBD variant reuse its
/// working allocations.
#[derive(Debug)]
pub enum Solver {
    /// Closed-form three-joint chain solver
    TwoBone(TwoBoneSolver),
    /// Iterative position-based solver
    Xpbd(XpbdSolver),
}

impl Solver {
    /// Instantiate the solver named by the config
    #[must_use]
    pub fn from_kind(kind: SolverKind) -> Self {
        match kind {
            SolverKind::TwoBone => Self::TwoBone(TwoBoneSolver::default()),
            SolverKind::Xpbd => Self::Xpbd(XpbdSolver::default()),
        }
    }

    /// Which strategy this instance runs
    #[must_use]
    pub const fn kind(&self) -> SolverKind {
        match self {
            Self::TwoBone(_) => SolverKind::TwoBone,
            Self::Xpbd(_) => SolverKind::Xpbd,
        }
    }

    /// Reshape the skeleton so the effector bones reach their targets
    pub fn solve(
        &mut self,
        config: &IkConfig,
        effectors: &EffectorTargets,
        skeleton: &mut IkSkeleton,
        root_displacement: f32,
    ) {
        match self {
            Self::TwoBone(solver) => solver.solve(config, effectors, skeleton, root_displacement),
            Self::Xpbd(solver) => solver.solve(config, effectors, skeleton, root_displacement),
        }
    }
}

/// Translate the bone named `root` by the accumulated ground offset.
///
/// Runs on the per-frame working snapshot, so the translation never
/// accumulates across frames.
pub(crate) fn apply_root_displacement(skeleton: &mut IkSkeleton, root_displacement: f32) {
    if let Some(root) = skeleton.index_by_name("root") {
        skeleton.translate(
            root,
            Vec3::new(0.0, 0.0, root_displacement),
            crate::node::TransformSpace::Arena,
        );
    }
}
