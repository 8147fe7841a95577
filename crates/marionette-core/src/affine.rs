//! Affine transform with dual matrix/config representation
//!
//! An [`AffineTransform`] keeps both a `(rotation, position, scaling)`
//! record and a 4x4 matrix, with one side authoritative at a time. Reading
//! the stale side reconstructs it on demand, so call sites can freely mix
//! matrix math with component-wise edits.

use crate::math::mat_to_quat;
use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rotation/position/scaling components of an affine transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Rotation as a unit quaternion
    pub rotation: Quat,
    /// Translation
    pub position: Vec3,
    /// Per-axis scaling (signed; negative after a handedness flip)
    pub scaling: Vec3,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scaling: Vec3::ONE,
        }
    }
}

impl TransformConfig {
    /// Create a new config
    #[must_use]
    pub const fn new(rotation: Quat, position: Vec3, scaling: Vec3) -> Self {
        Self {
            rotation,
            position,
            scaling,
        }
    }

    /// Transform a point from this transform's space into world space
    #[must_use]
    pub fn transform_position(&self, p: Vec3) -> Vec3 {
        self.rotation * (self.scaling * p) + self.position
    }

    /// Transform a world-space point into this transform's space
    #[must_use]
    pub fn inverse_transform_position(&self, p: Vec3) -> Vec3 {
        (self.rotation.inverse() * (p - self.position)) / self.scaling
    }
}

/// Which representation is out of date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stale {
    /// Both sides agree
    None,
    /// The matrix lags behind the config
    Matrix,
    /// The config lags behind the matrix
    Config,
}

/// Lazily-synchronized affine transform
#[derive(Debug, Clone, Copy)]
pub struct AffineTransform {
    matrix: Mat4,
    config: TransformConfig,
    stale: Stale,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::from_config(TransformConfig::default())
    }
}

impl AffineTransform {
    /// Build from components; the matrix is reconstructed on first read
    #[must_use]
    pub const fn from_config(config: TransformConfig) -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            config,
            stale: Stale::Matrix,
        }
    }

    /// Build from a matrix; the config is reconstructed on first read
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            matrix,
            config: TransformConfig::default(),
            stale: Stale::Config,
        }
    }

    /// Read the matrix, reconstructing it if the config is authoritative
    pub fn matrix(&mut self) -> Mat4 {
        self.sync_matrix();
        self.matrix
    }

    /// Read the components, reconstructing them if the matrix is authoritative
    pub fn config(&mut self) -> TransformConfig {
        self.sync_config();
        self.config
    }

    /// Mutably access the matrix; the config becomes stale
    pub fn matrix_mut(&mut self) -> &mut Mat4 {
        self.sync_matrix();
        self.stale = Stale::Config;
        &mut self.matrix
    }

    /// Mutably access the components; the matrix becomes stale
    pub fn config_mut(&mut self) -> &mut TransformConfig {
        self.sync_config();
        self.stale = Stale::Matrix;
        &mut self.config
    }

    fn sync_matrix(&mut self) {
        if self.stale != Stale::Matrix {
            return;
        }
        self.stale = Stale::None;
        self.matrix = Mat4::from_scale_rotation_translation(
            self.config.scaling,
            self.config.rotation,
            self.config.position,
        );
    }

    fn sync_config(&mut self) {
        if self.stale != Stale::Config {
            return;
        }
        self.stale = Stale::None;

        let position = self.matrix.w_axis.truncate();
        let mut c0 = self.matrix.x_axis.truncate();
        let mut c1 = self.matrix.y_axis.truncate();
        let mut c2 = self.matrix.z_axis.truncate();
        let mut scaling = Vec3::new(
            normalize_for_size(&mut c0),
            normalize_for_size(&mut c1),
            normalize_for_size(&mut c2),
        );

        // Left-handed basis: negate rotation and scale together so the
        // rotation stays a proper rotation and the flip lives in the scale.
        if c0.cross(c1).dot(c2) < 0.0 {
            c0 = -c0;
            c1 = -c1;
            c2 = -c2;
            scaling = -scaling;
        }

        self.config = TransformConfig {
            rotation: mat_to_quat(&Mat3::from_cols(c0, c1, c2)),
            position,
            scaling,
        };
    }
}

/// Normalize a column in place, returning its former length.
/// Near-zero columns are zeroed and report zero scale.
fn normalize_for_size(v: &mut Vec3) -> f32 {
    const LEN_EPS: f32 = 1e-16;
    let len = v.length();
    if len < LEN_EPS {
        *v = Vec3::ZERO;
        0.0
    } else {
        *v /= len;
        len
    }
}
