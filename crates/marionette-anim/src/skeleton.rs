//! Flat skeleton snapshot records
//!
//! A [`Skeleton`] is a contiguous array of [`Bone`] records as produced by
//! the animation pipeline each frame. When `is_flat` holds, `bone.id` equals
//! its index and parents always precede children, so a single forward pass
//! over the array visits parents first.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Sentinel parent id for root bones (a self-referencing id also counts)
pub const NO_PARENT: usize = usize::MAX;

/// One joint of the animation skeleton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    /// Stable identifier; equal to the array index when the skeleton is flat
    pub id: usize,
    /// Parent bone id; [`NO_PARENT`] or `id` itself for roots
    pub parent_id: usize,
    /// Bone name
    pub name: String,
    /// Local rotation relative to the parent
    pub rotation: Quat,
    /// Local position relative to the parent
    pub position: Vec3,
    /// Local scale relative to the parent
    pub scale: Vec3,
    /// Cached world-relative rotation
    pub derived_rotation: Quat,
    /// Cached world-relative position
    pub derived_position: Vec3,
    /// Cached world-relative scale
    pub derived_scale: Vec3,
    /// Inverse of the bind-pose world matrix, supplied by the asset
    pub inverse_tpose: Mat4,
}

impl Bone {
    /// Create a bone with identity transforms
    #[must_use]
    pub fn new(id: usize, parent_id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            derived_rotation: Quat::IDENTITY,
            derived_position: Vec3::ZERO,
            derived_scale: Vec3::ONE,
            inverse_tpose: Mat4::IDENTITY,
        }
    }

    /// Create a bone at a local position with identity rotation and scale
    #[must_use]
    pub fn with_position(id: usize, parent_id: usize, name: impl Into<String>, position: Vec3) -> Self {
        let mut bone = Self::new(id, parent_id, name);
        bone.position = position;
        bone
    }

    /// Whether this bone is a root (sentinel or self-referencing parent)
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id == NO_PARENT || self.parent_id == self.id
    }
}

/// Flat bone array plus lookup metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    /// Bones, parents before children when flat
    pub bones: Vec<Bone>,
    /// Whether `bone.id == index` for every bone
    pub is_flat: bool,
}

impl Skeleton {
    /// Build a skeleton, detecting whether the bone array is flat
    #[must_use]
    pub fn from_bones(bones: Vec<Bone>) -> Self {
        let is_flat = bones.iter().enumerate().all(|(i, b)| b.id == i);
        Self { bones, is_flat }
    }

    /// Number of bones
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Index of the bone with the given name, O(n)
    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Bone with the given name, O(n)
    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Refresh every `derived_*` field by composing down the hierarchy.
    ///
    /// Flat skeletons guarantee parents precede children, so one forward
    /// pass suffices. Non-flat skeletons fall back to id lookup per bone.
    pub fn refresh_derived(&mut self) {
        for i in 0..self.bones.len() {
            let parent = if self.bones[i].is_root() {
                None
            } else {
                find_by_id(&self.bones, self.bones[i].parent_id, self.is_flat)
            };

            match parent {
                Some(p) if p != i => {
                    let (rot, pos, scale) = {
                        let parent = &self.bones[p];
                        (
                            parent.derived_rotation,
                            parent.derived_position,
                            parent.derived_scale,
                        )
                    };
                    let bone = &mut self.bones[i];
                    bone.derived_rotation = (rot * bone.rotation).normalize();
                    bone.derived_scale = scale * bone.scale;
                    bone.derived_position = pos + rot * (scale * bone.position);
                }
                _ => {
                    let bone = &mut self.bones[i];
                    bone.derived_rotation = bone.rotation;
                    bone.derived_position = bone.position;
                    bone.derived_scale = bone.scale;
                }
            }
        }
    }
}

/// Resolve a bone id to its array index.
///
/// O(1) for flat skeletons, linear scan otherwise. The sentinel id and
/// out-of-range flat ids resolve to `None`.
#[must_use]
pub fn find_by_id(bones: &[Bone], id: usize, is_flat: bool) -> Option<usize> {
    if id == NO_PARENT {
        return None;
    }
    if is_flat {
        if id >= bones.len() {
            None
        } else {
            Some(id)
        }
    } else {
        bones.iter().position(|b| b.id == id)
    }
}
