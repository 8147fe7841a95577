//! Collision shapes and query results

use glam::Vec3;

/// Collider shapes accepted by sweep and overlap queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Sphere with radius
    Sphere {
        /// Radius in meters
        radius: f32,
    },
    /// Capsule aligned with the local Z axis
    Capsule {
        /// Half the segment length (excluding caps)
        half_height: f32,
        /// Cap radius
        radius: f32,
    },
    /// Box with half-extents
    Box {
        /// Half-extent per axis
        half_extents: Vec3,
    },
}

impl Shape {
    /// Create a sphere
    #[must_use]
    pub const fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Create a capsule from full height and radius
    #[must_use]
    pub const fn capsule(height: f32, radius: f32) -> Self {
        Self::Capsule {
            half_height: height / 2.0,
            radius,
        }
    }
}

/// A single ray or sweep hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Hit position in world space
    pub position: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capsule_halves_height() {
        let Shape::Capsule { half_height, radius } = Shape::capsule(1.8, 0.3) else {
            panic!("expected capsule");
        };
        assert!((half_height - 0.9).abs() < f32::EPSILON);
        assert!((radius - 0.3).abs() < f32::EPSILON);
    }
}
