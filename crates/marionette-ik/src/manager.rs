//! Per-frame IK orchestration
//!
//! [`IkManager`] owns everything the pass needs between frames: the config
//! cache, the effector and stable-rotation tables, the accumulated root
//! displacement, the pooled working skeleton, and the solver instance. One
//! call to [`resolve`](IkManager::resolve) runs the whole pass.

use crate::config::{EffectorMode, IkConfig};
use crate::skeleton::IkSkeleton;
use crate::solver::{EffectorTargets, Solver};
use glam::{Quat, Vec3};
use marionette_anim::Skeleton;
use marionette_core::TransformConfig;
use marionette_physics::PhysicsScene;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owned context for the IK pass; lives on the animation thread
#[derive(Debug, Default)]
pub struct IkManager {
    config_cache: HashMap<PathBuf, Arc<IkConfig>>,
    end_effectors: EffectorTargets,
    stable_rotation: BTreeMap<String, Quat>,
    root_displacement: f32,
    work: IkSkeleton,
    solver: Option<Solver>,
}

impl IkManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current end-effector targets, keyed by bone name
    #[must_use]
    pub const fn end_effectors(&self) -> &EffectorTargets {
        &self.end_effectors
    }

    /// Ground offset chosen by the last target pass (≤ 0)
    #[must_use]
    pub const fn root_displacement(&self) -> f32 {
        self.root_displacement
    }

    /// Fetch a config from the cache, loading it on first use.
    ///
    /// Load failures are logged and yield `None`; the caller skips the
    /// frame rather than solving with a bad rig.
    pub fn try_get_config(&mut self, path: &Path) -> Option<Arc<IkConfig>> {
        if let Some(config) = self.config_cache.get(path) {
            return Some(Arc::clone(config));
        }
        match IkConfig::load(path) {
            Ok(config) => {
                let config = Arc::new(config);
                self.config_cache
                    .insert(path.to_path_buf(), Arc::clone(&config));
                Some(config)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load IK config");
                None
            }
        }
    }

    /// Run the full IK pass for one frame, loading the config by path
    pub fn resolve(
        &mut self,
        skeleton: &mut Skeleton,
        object_transform: &TransformConfig,
        scene: &dyn PhysicsScene,
        config_path: &Path,
    ) {
        let Some(config) = self.try_get_config(config_path) else {
            return;
        };
        self.resolve_with(skeleton, object_transform, scene, &config);
    }

    /// Run the full IK pass for one frame with an already-loaded config
    pub fn resolve_with(
        &mut self,
        skeleton: &mut Skeleton,
        object_transform: &TransformConfig,
        scene: &dyn PhysicsScene,
        config: &IkConfig,
    ) {
        self.set_targets(skeleton, object_transform, scene, config);
        self.work.copy_from(skeleton);

        if self.solver.as_ref().map(Solver::kind) != Some(config.solver) {
            self.solver = Some(Solver::from_kind(config.solver));
        }
        if let Some(solver) = self.solver.as_mut() {
            solver.solve(config, &self.end_effectors, &mut self.work, self.root_displacement);
        }

        // Bones such as feet keep their pre-solve world orientation
        for (name, snapshot) in &self.stable_rotation {
            let Some(i) = self.work.index_by_name(name) else {
                continue;
            };
            let Some(p) = self.work.parent_index(i) else {
                continue;
            };
            let parent_derived = self.work.bone(p).derived_rotation();
            let bone = self.work.bone_mut(i);
            bone.set_rotation(parent_derived.inverse() * *snapshot);
            bone.force_derived_rotation(*snapshot);
        }

        self.work.copy_to(skeleton);
    }

    /// Choose this frame's targets and stable rotations from the current pose
    fn set_targets(
        &mut self,
        skeleton: &Skeleton,
        object_transform: &TransformConfig,
        scene: &dyn PhysicsScene,
        config: &IkConfig,
    ) {
        self.root_displacement = 0.0;
        self.end_effectors.clear();
        self.stable_rotation.clear();

        for effector in &config.effectors {
            let Some(bone) = skeleton.bone_by_name(&effector.bone) else {
                tracing::warn!(bone = %effector.bone, "end effector refers to an unknown bone");
                continue;
            };
            let foot_position = bone.derived_position;

            let target = match effector.mode {
                EffectorMode::Offset { offset } => foot_position + offset,
                EffectorMode::Ground => {
                    let origin = object_transform.transform_position(foot_position)
                        + Vec3::Z * config.max_step_up;
                    let hits = scene.raycast(origin, -Vec3::Z, 2.0 * config.max_step_up);

                    hits.iter()
                        .max_by(|a, b| a.position.z.total_cmp(&b.position.z))
                        .map_or(foot_position, |hit| {
                            let hit_object =
                                object_transform.inverse_transform_position(hit.position);
                            if hit_object.z < self.root_displacement {
                                self.root_displacement = hit_object.z;
                            }
                            hit_object + Vec3::new(0.0, 0.0, foot_position.z)
                        })
                }
            };
            self.end_effectors.insert(effector.bone.clone(), target);
        }

        for name in &config.stable_bones {
            if let Some(bone) = skeleton.bone_by_name(name) {
                self.stable_rotation
                    .insert(name.clone(), bone.derived_rotation);
            } else {
                tracing::warn!(bone = %name, "stable bone not found in skeleton");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EffectorConfig, SolverKind};
    use marionette_anim::{Bone, NO_PARENT};
    use marionette_physics::FlatGround;

    fn leg_chain() -> Skeleton {
        let mut skeleton = Skeleton::from_bones(vec![
            Bone::with_position(0, NO_PARENT, "root", Vec3::ZERO),
            Bone::with_position(1, 0, "mid", Vec3::X),
            Bone::with_position(2, 1, "foot", Vec3::X),
        ]);
        skeleton.refresh_derived();
        skeleton
    }

    fn offset_config(solver: SolverKind, offset: Vec3) -> IkConfig {
        IkConfig {
            solver,
            effectors: vec![EffectorConfig {
                bone: "foot".to_string(),
                mode: EffectorMode::Offset { offset },
            }],
            ..IkConfig::default()
        }
    }

    #[test]
    fn offset_targets_use_current_pose() {
        let skeleton = leg_chain();
        let config = offset_config(SolverKind::TwoBone, Vec3::new(-0.5, 0.5, 0.0));
        let mut manager = IkManager::new();
        manager.set_targets(
            &skeleton,
            &TransformConfig::default(),
            &FlatGround::new(-100.0),
            &config,
        );

        let target = manager.end_effectors()["foot"];
        assert!((target - Vec3::new(1.5, 0.5, 0.0)).length() < 1e-6);
        assert!(manager.root_displacement().abs() < f32::EPSILON);
    }

    #[test]
    fn ground_probe_picks_highest_hit_and_tracks_displacement() {
        let mut skeleton = Skeleton::from_bones(vec![
            Bone::with_position(0, NO_PARENT, "root", Vec3::ZERO),
            Bone::with_position(1, 0, "mid", Vec3::new(0.0, 0.0, 0.2)),
            Bone::with_position(2, 1, "foot", Vec3::new(0.0, 0.0, -0.1)),
        ]);
        skeleton.refresh_derived();
        // foot derived sits at z = 0.1

        let config = IkConfig {
            solver: SolverKind::Xpbd,
            effectors: vec![EffectorConfig {
                bone: "foot".to_string(),
                mode: EffectorMode::Ground,
            }],
            ..IkConfig::default()
        };

        let mut manager = IkManager::new();
        manager.set_targets(
            &skeleton,
            &TransformConfig::default(),
            &FlatGround::new(-0.2),
            &config,
        );

        // hit at z=-0.2, plus the foot's original height 0.1
        let target = manager.end_effectors()["foot"];
        assert!((target - Vec3::new(0.0, 0.0, -0.1)).length() < 1e-5, "target {target:?}");
        assert!((manager.root_displacement() + 0.2).abs() < 1e-5);
    }

    #[test]
    fn ground_probe_miss_keeps_foot_in_place() {
        let skeleton = leg_chain();
        let config = IkConfig {
            effectors: vec![EffectorConfig {
                bone: "foot".to_string(),
                mode: EffectorMode::Ground,
            }],
            ..IkConfig::default()
        };

        let mut manager = IkManager::new();
        manager.set_targets(
            &skeleton,
            &TransformConfig::default(),
            &FlatGround::new(-50.0),
            &config,
        );

        let target = manager.end_effectors()["foot"];
        assert!((target - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        assert!(manager.root_displacement().abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_drives_effector_to_target() {
        let mut skeleton = leg_chain();
        let config = offset_config(SolverKind::TwoBone, Vec3::new(-0.5, 0.5, 0.0));

        let mut manager = IkManager::new();
        manager.resolve_with(
            &mut skeleton,
            &TransformConfig::default(),
            &FlatGround::new(-100.0),
            &config,
        );

        let foot = skeleton.bones[2].derived_position;
        assert!((foot - Vec3::new(1.5, 0.5, 0.0)).length() < 1e-3, "foot at {foot:?}");
    }

    #[test]
    fn stable_bones_keep_world_rotation() {
        let mut skeleton = Skeleton::from_bones(vec![
            Bone::with_position(0, NO_PARENT, "root", Vec3::ZERO),
            Bone::with_position(1, 0, "hip", Vec3::ZERO),
            Bone::with_position(2, 1, "foot", Vec3::new(0.0, 0.0, 1.0)),
        ]);
        skeleton.refresh_derived();

        let config = IkConfig {
            solver: SolverKind::Xpbd,
            driven_bones: vec!["foot".to_string()],
            effectors: vec![EffectorConfig {
                bone: "foot".to_string(),
                mode: EffectorMode::Offset {
                    offset: Vec3::new(0.0, 1.0, -1.0),
                },
            }],
            stable_bones: vec!["foot".to_string()],
            ..IkConfig::default()
        };

        let mut manager = IkManager::new();
        manager.resolve_with(
            &mut skeleton,
            &TransformConfig::default(),
            &FlatGround::new(-100.0),
            &config,
        );

        // The hip rotated to reach the target...
        let foot = skeleton.bones[2].derived_position;
        assert!((foot - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-3, "foot at {foot:?}");
        // ...but the foot's world orientation is the pre-solve one
        assert!(
            skeleton.bones[2].derived_rotation.dot(Quat::IDENTITY).abs() > 1.0 - 1e-4,
            "foot rotation {:?}",
            skeleton.bones[2].derived_rotation
        );
    }

    #[test]
    fn config_cache_loads_once() {
        let path = std::env::temp_dir().join(format!(
            "marionette-ik-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "solver": "two_bone" }"#).expect("temp config written");

        let mut manager = IkManager::new();
        let first = manager.try_get_config(&path).expect("config loads");
        let second = manager.try_get_config(&path).expect("config cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.solver, SolverKind::TwoBone);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_config_yields_none() {
        let mut manager = IkManager::new();
        assert!(manager
            .try_get_config(Path::new("/nonexistent/rig.ik.json"))
            .is_none());
    }
}
