//! Solver-side skeleton
//!
//! [`IkSkeleton`] mirrors the animation skeleton into [`IkBone`]s the
//! solvers can mutate, and copies the result back out. Parent links are kept
//! as a cached index table rebuilt whenever a copy-in changes the bone
//! count, so lookups stay O(1) for flat skeletons.

use crate::node::{IkBone, TransformSpace};
use glam::{Quat, Vec3};
use marionette_anim::{find_by_id, Skeleton};

/// Mutable working copy of the animation skeleton
#[derive(Debug, Clone, Default)]
pub struct IkSkeleton {
    bones: Vec<IkBone>,
    parents: Vec<Option<usize>>,
    is_flat: bool,
}

impl IkSkeleton {
    /// Create an empty skeleton; populate it with [`copy_from`](Self::copy_from)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bones
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// All bones in id order
    #[must_use]
    pub fn bones(&self) -> &[IkBone] {
        &self.bones
    }

    /// Bone at `index`
    #[must_use]
    pub fn bone(&self, index: usize) -> &IkBone {
        &self.bones[index]
    }

    /// Mutable bone at `index`
    pub fn bone_mut(&mut self, index: usize) -> &mut IkBone {
        &mut self.bones[index]
    }

    /// Index of the bone with the given name, O(n)
    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Resolved parent index of the bone at `index`, `None` for roots
    #[must_use]
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Indices of every direct child of the bone at `index`
    #[must_use]
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&c| self.parents[c] == Some(index))
            .collect()
    }

    /// Snapshot the animation skeleton in.
    ///
    /// When the bone count matches, only transforms are copied; otherwise
    /// the bone array is rebuilt and the parent index table is re-derived
    /// from the copied parent ids.
    pub fn copy_from(&mut self, skeleton: &Skeleton) {
        if self.bones.len() == skeleton.bone_count() {
            self.is_flat = skeleton.is_flat;
            for (bone, src) in self.bones.iter_mut().zip(&skeleton.bones) {
                bone.copy_from(src);
            }
            return;
        }

        self.is_flat = skeleton.is_flat;
        self.bones = skeleton
            .bones
            .iter()
            .map(|src| {
                let mut bone = IkBone::default();
                bone.copy_from(src);
                bone
            })
            .collect();
        self.relink_parents(skeleton);
    }

    fn relink_parents(&mut self, skeleton: &Skeleton) {
        self.parents = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                find_by_id(&skeleton.bones, bone.parent_id, self.is_flat)
                    .filter(|&p| p != i)
            })
            .collect();
    }

    /// Write local and derived transforms back into the animation skeleton.
    ///
    /// Every bone is updated first, in ascending id order, so parents are
    /// refreshed before their children consult them (flat skeletons keep
    /// `parent_id < id`).
    pub fn copy_to(&mut self, skeleton: &mut Skeleton) {
        debug_assert_eq!(self.bones.len(), skeleton.bone_count());

        for i in 0..self.bones.len() {
            self.update(i);
        }
        for (bone, dst) in self.bones.iter().zip(skeleton.bones.iter_mut()) {
            bone.copy_to(dst);
        }
    }

    /// Recompute the derived transform of the bone at `index`
    pub fn update_derived(&mut self, index: usize) {
        self.with_parent(index, IkBone::update_derived_transform);
    }

    /// Recompute the derived transform and clear the dirty flag
    pub fn update(&mut self, index: usize) {
        self.with_parent(index, IkBone::update);
    }

    /// Rotate the bone at `index` in the given reference frame
    pub fn rotate(&mut self, index: usize, q: Quat, space: TransformSpace) {
        self.bones[index].rotate(q, space);
    }

    /// Translate the bone at `index` in the given reference frame
    pub fn translate(&mut self, index: usize, d: Vec3, space: TransformSpace) {
        self.with_parent(index, |bone, parent| bone.translate(d, space, parent));
    }

    /// Borrow a bone mutably together with its parent immutably
    fn with_parent<R>(&mut self, index: usize, f: impl FnOnce(&mut IkBone, Option<&IkBone>) -> R) -> R {
        match self.parent_index(index) {
            None => f(&mut self.bones[index], None),
            Some(p) if p < index => {
                let (left, right) = self.bones.split_at_mut(index);
                f(&mut right[0], Some(&left[p]))
            }
            Some(p) => {
                let (left, right) = self.bones.split_at_mut(p);
                f(&mut left[index], Some(&right[0]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_anim::{Bone, NO_PARENT};

    fn chain(positions: &[Vec3]) -> Skeleton {
        let bones = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let parent = if i == 0 { NO_PARENT } else { i - 1 };
                Bone::with_position(i, parent, format!("bone{i}"), p)
            })
            .collect();
        let mut skeleton = Skeleton::from_bones(bones);
        skeleton.refresh_derived();
        skeleton
    }

    #[test]
    fn copy_from_rebuilds_parent_links() {
        let src = chain(&[Vec3::ZERO, Vec3::X, Vec3::X]);
        let mut ik = IkSkeleton::new();
        ik.copy_from(&src);

        assert_eq!(ik.bone_count(), 3);
        assert_eq!(ik.parent_index(0), None);
        assert_eq!(ik.parent_index(1), Some(0));
        assert_eq!(ik.parent_index(2), Some(1));
        assert_eq!(ik.children_of(1), vec![2]);
    }

    #[test]
    fn same_count_copy_keeps_links() {
        let src = chain(&[Vec3::ZERO, Vec3::X]);
        let mut ik = IkSkeleton::new();
        ik.copy_from(&src);

        let mut moved = src.clone();
        moved.bones[1].position = Vec3::new(0.0, 2.0, 0.0);
        moved.refresh_derived();
        ik.copy_from(&moved);

        assert_eq!(ik.parent_index(1), Some(0));
        assert!((ik.bone(1).position() - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn copy_to_updates_parents_before_children() {
        let mut src = chain(&[Vec3::ZERO, Vec3::X, Vec3::X]);
        let mut ik = IkSkeleton::new();
        ik.copy_from(&src);

        // Rotate the root a quarter turn; children must follow through the
        // derived chain on the way out
        ik.rotate(0, Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2), TransformSpace::Local);
        ik.copy_to(&mut src);

        assert!((src.bones[1].derived_position - Vec3::Y).length() < 1e-5);
        assert!((src.bones[2].derived_position - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn name_lookup() {
        let src = chain(&[Vec3::ZERO, Vec3::X]);
        let mut ik = IkSkeleton::new();
        ik.copy_from(&src);
        assert_eq!(ik.index_by_name("bone1"), Some(1));
        assert_eq!(ik.index_by_name("spine"), None);
    }

    #[test]
    fn self_referencing_root_has_no_parent() {
        let bones = vec![Bone::new(0, 0, "pelvis")];
        let src = Skeleton::from_bones(bones);
        let mut ik = IkSkeleton::new();
        ik.copy_from(&src);
        assert_eq!(ik.parent_index(0), None);
    }
}
