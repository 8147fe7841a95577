//! Extended position-based dynamics solver
//!
//! Treats every bone as a particle, connects each non-root bone to its
//! parent with a compliant length constraint, pins effector particles to
//! their targets, and runs Gauss-Seidel projection inside a fixed outer
//! momentum loop. A final pass converts the particle displacements back
//! into joint rotations.

use crate::config::IkConfig;
use crate::node::TransformSpace;
use crate::skeleton::IkSkeleton;
use crate::solver::{apply_root_displacement, EffectorTargets};
use glam::Vec3;
use marionette_core::math::get_rotation_to;

/// Compliant distance constraint between a bone particle and its parent
#[derive(Debug, Clone)]
struct LengthConstraint {
    /// Stiffness coefficient
    k: f32,
    /// Accumulated Lagrange multiplier, reset each moment step
    lambda: f32,
    /// Rest length, the magnitude of the bone's local position
    rest_length: f32,
    /// Bone particle index
    i: usize,
    /// Parent particle index
    j: usize,
}

/// A virtual force applied to one particle at the start of the solve
#[derive(Debug, Clone, Copy)]
struct DirectionForce {
    i: usize,
    force: Vec3,
}

/// Position-based solver over all bones.
///
/// Working arrays are kept between calls and rebuilt per solve, so a
/// long-lived instance does not reallocate every frame.
#[derive(Debug, Default)]
pub struct XpbdSolver {
    position: Vec<Vec3>,
    last_position: Vec<Vec3>,
    velocity: Vec<Vec3>,
    invmass: Vec<f32>,
    constraints: Vec<LengthConstraint>,
    forces: Vec<DirectionForce>,
    targets: Vec<(usize, Vec3)>,
    children: Vec<Vec<usize>>,
}

impl XpbdSolver {
    /// Run the particle simulation, then recover joint rotations
    pub fn solve(
        &mut self,
        config: &IkConfig,
        effectors: &EffectorTargets,
        skeleton: &mut IkSkeleton,
        root_displacement: f32,
    ) {
        self.build(config, effectors, skeleton, root_displacement);

        let tau = config.pseudo_time;
        let tau_sqr = config.pseudo_time_sqr();

        for force in &self.forces {
            self.velocity[force.i] += force.force * self.invmass[force.i] * tau;
        }

        for _ in 0..config.moment_steps {
            self.process_moment(config.iter_times, tau_sqr);
        }

        self.reach_by_rotation(skeleton);
        apply_root_displacement(skeleton, root_displacement);
    }

    /// Rebuild the per-call working sets from the skeleton and config
    fn build(
        &mut self,
        config: &IkConfig,
        effectors: &EffectorTargets,
        skeleton: &IkSkeleton,
        root_displacement: f32,
    ) {
        let n = skeleton.bone_count();

        self.position.clear();
        self.position.resize(n, Vec3::ZERO);
        self.velocity.clear();
        self.velocity.resize(n, Vec3::ZERO);

        self.last_position.clear();
        self.last_position
            .extend(skeleton.bones().iter().map(|b| b.derived_position()));

        self.invmass.clear();
        self.invmass.resize(n, config.default_inv_mass);
        for name in &config.driven_bones {
            if let Some(i) = skeleton.index_by_name(name) {
                self.invmass[i] = config.driven_inv_mass;
            } else {
                tracing::warn!(bone = %name, "driven bone not found in skeleton");
            }
        }

        self.constraints.clear();
        self.children.clear();
        self.children.resize(n, Vec::new());
        for i in 0..n {
            if let Some(j) = skeleton.parent_index(i) {
                self.constraints.push(LengthConstraint {
                    k: config.stiffness,
                    lambda: 0.0,
                    rest_length: skeleton.bone(i).position().length(),
                    i,
                    j,
                });
                self.children[j].push(i);
            }
        }

        self.forces.clear();
        for entry in &config.direction_forces {
            if let Some(i) = skeleton.index_by_name(&entry.bone) {
                self.forces.push(DirectionForce {
                    i,
                    force: entry.force,
                });
            } else {
                tracing::warn!(bone = %entry.bone, "direction force bone not found in skeleton");
            }
        }

        self.targets.clear();
        for (name, target) in effectors {
            if let Some(i) = skeleton.index_by_name(name) {
                let mut target = *target;
                target.z -= root_displacement;
                self.targets.push((i, target));
            } else {
                tracing::warn!(bone = %name, "end effector refers to an unknown bone");
            }
        }
    }

    /// One outer iteration: predict, pin, project, re-pin, integrate
    fn process_moment(&mut self, iter_times: u32, tau_sqr: f32) {
        for i in 0..self.position.len() {
            self.position[i] = self.last_position[i] + self.velocity[i];
        }
        self.pin_targets();

        for constraint in &mut self.constraints {
            constraint.lambda = 0.0;
        }
        for _ in 0..iter_times {
            self.process_iter(tau_sqr);
        }

        // Projection may have dragged pinned particles off their targets
        self.pin_targets();

        for i in 0..self.position.len() {
            self.velocity[i] = self.position[i] - self.last_position[i];
            self.last_position[i] = self.position[i];
        }
    }

    /// One Gauss-Seidel sweep over all length constraints
    fn process_iter(&mut self, tau_sqr: f32) {
        for constraint in &mut self.constraints {
            let dx = self.position[constraint.i] - self.position[constraint.j];
            let len = dx.length();
            let violation = len - constraint.rest_length;

            let alpha = constraint.k / tau_sqr;
            let dlambda = (-violation - alpha * constraint.lambda)
                / (self.invmass[constraint.i] + self.invmass[constraint.j] + alpha);

            let correction = if len > 1e-8 {
                dx / len * dlambda
            } else {
                Vec3::ZERO
            };

            constraint.lambda += dlambda;
            self.position[constraint.i] += correction * self.invmass[constraint.i];
            self.position[constraint.j] -= correction * self.invmass[constraint.j];
        }
    }

    fn pin_targets(&mut self) {
        for &(i, target) in &self.targets {
            self.position[i] = target;
        }
    }

    /// Convert particle displacements into joint rotations.
    ///
    /// Ascending id order so a parent's derived transform is refreshed
    /// before its children read it.
    fn reach_by_rotation(&self, skeleton: &mut IkSkeleton) {
        for i in 0..skeleton.bone_count() {
            if skeleton.parent_index(i).is_none() {
                continue;
            }
            let children = &self.children[i];
            if children.is_empty() {
                continue;
            }

            let inv_count = 1.0 / children.len() as f32;
            let old_mean: Vec3 = children
                .iter()
                .map(|&c| skeleton.bone(c).derived_position())
                .sum::<Vec3>()
                * inv_count;
            let new_mean: Vec3 =
                children.iter().map(|&c| self.position[c]).sum::<Vec3>() * inv_count;

            let old_dir = old_mean - skeleton.bone(i).derived_position();
            let new_dir = new_mean - self.position[i];

            let q = get_rotation_to(old_dir, new_dir, Vec3::ZERO);
            skeleton.rotate(i, q, TransformSpace::Object);
            skeleton.update_derived(i);
        }
    }
}
