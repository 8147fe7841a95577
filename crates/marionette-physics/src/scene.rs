//! Physics scene oracle
//!
//! IK never steps a simulation; it only asks the active scene where the
//! ground is. [`PhysicsScene`] is that contract, and [`FlatGround`] is the
//! trivial implementation used by tests and benches.

use crate::collision::{RaycastHit, Shape};
use glam::Vec3;
use marionette_core::TransformConfig;

/// Read-only query interface over the active physics scene
pub trait PhysicsScene {
    /// Cast a ray and return every hit within `distance`, unordered
    fn raycast(&self, origin: Vec3, direction: Vec3, distance: f32) -> Vec<RaycastHit>;

    /// Sweep a shape and return every hit within `distance`, unordered
    fn sweep(
        &self,
        shape: &Shape,
        transform: &TransformConfig,
        direction: Vec3,
        distance: f32,
    ) -> Vec<RaycastHit>;

    /// Whether a shape placed at `transform` overlaps any collider
    fn is_overlap(&self, shape: &Shape, transform: &TransformConfig) -> bool;
}

/// An infinite horizontal plane at a fixed height (Z-up)
#[derive(Debug, Clone, Copy)]
pub struct FlatGround {
    /// World-space Z of the plane
    pub height: f32,
}

impl FlatGround {
    /// Plane at the given Z height
    #[must_use]
    pub const fn new(height: f32) -> Self {
        Self { height }
    }

    fn ray_plane(&self, origin: Vec3, direction: Vec3, distance: f32) -> Option<RaycastHit> {
        let dir = direction.normalize_or_zero();
        if dir.z.abs() < 1e-8 {
            return None;
        }
        let t = (self.height - origin.z) / dir.z;
        if t < 0.0 || t > distance {
            return None;
        }
        Some(RaycastHit {
            position: origin + dir * t,
            normal: Vec3::Z,
            distance: t,
        })
    }
}

impl PhysicsScene for FlatGround {
    fn raycast(&self, origin: Vec3, direction: Vec3, distance: f32) -> Vec<RaycastHit> {
        self.ray_plane(origin, direction, distance)
            .into_iter()
            .collect()
    }

    fn sweep(
        &self,
        shape: &Shape,
        transform: &TransformConfig,
        direction: Vec3,
        distance: f32,
    ) -> Vec<RaycastHit> {
        // A plane sweep reduces to a raycast from the shape's lowest point
        let bottom_offset = match *shape {
            Shape::Sphere { radius } | Shape::Capsule { radius, .. } => radius,
            Shape::Box { half_extents } => half_extents.z,
        };
        let origin = transform.position - Vec3::Z * bottom_offset;
        self.raycast(origin, direction, distance)
    }

    fn is_overlap(&self, shape: &Shape, transform: &TransformConfig) -> bool {
        let bottom_offset = match *shape {
            Shape::Sphere { radius } | Shape::Capsule { radius, .. } => radius,
            Shape::Box { half_extents } => half_extents.z,
        };
        transform.position.z - bottom_offset <= self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downward_ray_hits_plane() {
        let ground = FlatGround::new(0.0);
        let hits = ground.raycast(Vec3::new(1.0, 2.0, 3.0), -Vec3::Z, 10.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
        assert!((hits[0].distance - 3.0).abs() < 1e-6);
    }

    #[test]
    fn ray_misses_when_too_short_or_parallel() {
        let ground = FlatGround::new(0.0);
        assert!(ground.raycast(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, 1.0).is_empty());
        assert!(ground.raycast(Vec3::new(0.0, 0.0, 5.0), Vec3::X, 100.0).is_empty());
    }

    #[test]
    fn sweep_casts_from_shape_bottom() {
        let ground = FlatGround::new(0.0);
        let shape = Shape::sphere(0.5);
        let at = TransformConfig {
            position: Vec3::new(0.0, 0.0, 2.0),
            ..TransformConfig::default()
        };
        let hits = ground.sweep(&shape, &at, -Vec3::Z, 10.0);
        assert_eq!(hits.len(), 1);
        // The sphere's lowest point starts at z=1.5
        assert!((hits[0].distance - 1.5).abs() < 1e-6);
    }

    #[test]
    fn sphere_overlap_against_plane() {
        let ground = FlatGround::new(0.0);
        let shape = Shape::sphere(0.5);
        let mut at = TransformConfig {
            position: Vec3::new(0.0, 0.0, 0.4),
            ..TransformConfig::default()
        };
        assert!(ground.is_overlap(&shape, &at));
        at.position.z = 0.6;
        assert!(!ground.is_overlap(&shape, &at));
    }
}
