//! Closed-form two-bone solver
//!
//! Solves each three-joint chain (start, mid, end) analytically: the mid
//! joint is placed by the law of cosines inside the triangle spanned by the
//! chain lengths and the target, then the two joint rotations are recovered
//! as arc rotations in object space. Targets beyond reach snap the chain
//! colinear with the target direction.

use crate::config::IkConfig;
use crate::node::TransformSpace;
use crate::skeleton::IkSkeleton;
use crate::solver::{apply_root_displacement, EffectorTargets};
use glam::Vec3;
use marionette_core::math::get_rotation_to;

/// Analytic three-joint chain solver
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoBoneSolver;

impl TwoBoneSolver {
    /// Solve every effector chain, then offset the root by the ground displacement
    pub fn solve(
        &mut self,
        _config: &IkConfig,
        effectors: &EffectorTargets,
        skeleton: &mut IkSkeleton,
        root_displacement: f32,
    ) {
        for (name, target) in effectors {
            let mut target = *target;
            target.z -= root_displacement;

            let Some(end) = skeleton.index_by_name(name) else {
                tracing::warn!(bone = %name, "end effector refers to an unknown bone");
                continue;
            };
            let Some(mid) = skeleton.parent_index(end) else {
                debug_assert!(false, "effector chain needs two ancestors");
                tracing::warn!(bone = %name, "effector bone has no parent chain");
                continue;
            };
            let Some(start) = skeleton.parent_index(mid) else {
                debug_assert!(false, "effector chain needs two ancestors");
                tracing::warn!(bone = %name, "effector bone has no grandparent chain");
                continue;
            };

            let end_position = skeleton.bone(end).derived_position();
            let mid_position = skeleton.bone(mid).derived_position();
            let start_position = skeleton.bone(start).derived_position();

            let ik_vector = mid_position - start_position;
            let origin_target = target - start_position;
            let pole_vector = origin_target.cross(ik_vector);
            let proj_dir = pole_vector.cross(origin_target).normalize_or_zero();
            let rad_dir = origin_target.normalize_or_zero();

            let a = (mid_position - start_position).length();
            let b = (end_position - mid_position).length();
            let c = origin_target.length();

            let mid_target = if a + b <= c {
                // Unreachable: stretch the chain straight toward the target
                target = start_position + rad_dir * (a + b);
                start_position + rad_dir * a
            } else {
                let cos_angle = (a * a + c * c - b * b) / (2.0 * a * c);
                let sin_angle = (1.0 - cos_angle * cos_angle).max(0.0).sqrt();
                start_position + proj_dir * (a * sin_angle) + rad_dir * (a * cos_angle)
            };

            let start_rotation =
                get_rotation_to(mid_position - start_position, mid_target - start_position, Vec3::ZERO);
            skeleton.rotate(start, start_rotation, TransformSpace::Object);
            skeleton.update_derived(start);
            skeleton.update_derived(mid);
            skeleton.update_derived(end);

            let mid_rotation = get_rotation_to(
                skeleton.bone(end).derived_position() - skeleton.bone(mid).derived_position(),
                target - mid_target,
                Vec3::ZERO,
            );
            skeleton.rotate(mid, mid_rotation, TransformSpace::Object);
            skeleton.update_derived(mid);
            skeleton.update_derived(end);
        }

        apply_root_displacement(skeleton, root_displacement);
    }
}
