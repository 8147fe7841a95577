//! Typed IK configuration
//!
//! The asset loader hands the manager one of these records per rig. Tuning
//! defaults follow the solver defaults: 5 moment steps, 10 projection
//! iterations, pseudo-time 0.1, stiffness 1.0, inverse masses 1.0 for
//! driven bones and 0.001 for anchors.

use glam::Vec3;
use marionette_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which solver strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Closed-form three-joint chain solver
    TwoBone,
    /// Iterative position-based solver over all bones
    Xpbd,
}

/// How an end-effector target is chosen each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectorMode {
    /// Target = current derived position plus a fixed offset (test path)
    Offset {
        /// Object-space offset added to the bone's derived position
        offset: Vec3,
    },
    /// Target chosen by probing the physics scene below the bone
    Ground,
}

/// One end-effector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectorConfig {
    /// Bone name the target applies to
    pub bone: String,
    /// Target selection mode
    pub mode: EffectorMode,
}

/// A virtual directional force applied once per solve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionForceConfig {
    /// Bone name the force applies to
    pub bone: String,
    /// Force vector in object space
    pub force: Vec3,
}

/// Per-rig IK configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IkConfig {
    /// Solver strategy
    pub solver: SolverKind,
    /// Outer (moment) iterations of the XPBD loop
    pub moment_steps: u32,
    /// Inner (projection) iterations per moment step
    pub iter_times: u32,
    /// Pseudo time step of the XPBD loop
    pub pseudo_time: f32,
    /// Constraint stiffness coefficient
    pub stiffness: f32,
    /// Inverse mass for bones not listed in `driven_bones`
    pub default_inv_mass: f32,
    /// Inverse mass for bones listed in `driven_bones`
    pub driven_inv_mass: f32,
    /// Bones driven hard toward targets (effector chains)
    pub driven_bones: Vec<String>,
    /// End-effector table
    pub effectors: Vec<EffectorConfig>,
    /// Bones whose world rotation is restored after solving
    pub stable_bones: Vec<String>,
    /// Virtual forces applied at the start of each solve
    pub direction_forces: Vec<DirectionForceConfig>,
    /// Maximum step height the ground probe may climb
    pub max_step_up: f32,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::Xpbd,
            moment_steps: 5,
            iter_times: 10,
            pseudo_time: 0.1,
            stiffness: 1.0,
            default_inv_mass: 0.001,
            driven_inv_mass: 1.0,
            driven_bones: Vec::new(),
            effectors: Vec::new(),
            stable_bones: Vec::new(),
            direction_forces: Vec::new(),
            max_step_up: 0.5,
        }
    }
}

impl IkConfig {
    /// Squared pseudo time step
    #[must_use]
    pub fn pseudo_time_sqr(&self) -> f32 {
        self.pseudo_time * self.pseudo_time
    }

    /// Load a config record from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}
