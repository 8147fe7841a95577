//! IK-side bone node
//!
//! [`IkBone`] owns a local transform, the cached derived (object-space)
//! transform, and the initial-pose snapshot. Mutations go through setters so
//! the invariants hold everywhere: quaternions stay unit length, NaN input
//! degrades to identity/zero with a log line, and the dirty flag is raised.
//!
//! Parents are identified by index and resolved by the owning
//! [`IkSkeleton`](crate::skeleton::IkSkeleton); operations that need parent
//! data take it as an explicit argument.

use glam::{Mat4, Quat, Vec3};
use marionette_anim::Bone;
use marionette_core::math::normalize_quat;

/// Reference frame for [`IkBone::translate`] and [`IkBone::rotate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSpace {
    /// Relative to the bone's own local axes
    Local,
    /// Relative to object space (the skeleton's root space)
    Object,
    /// Relative to the world
    Arena,
}

/// A bone in the solver's working skeleton
#[derive(Debug, Clone)]
pub struct IkBone {
    /// Stable identifier; equals the array index when the skeleton is flat
    pub id: usize,
    /// Parent bone id (sentinel or self-id for roots)
    pub parent_id: usize,
    /// Bone name
    pub name: String,

    rotation: Quat,
    position: Vec3,
    scale: Vec3,

    derived_rotation: Quat,
    derived_position: Vec3,
    derived_scale: Vec3,

    initial_rotation: Quat,
    initial_position: Vec3,
    initial_scale: Vec3,

    inverse_tpose: Mat4,
    dirty: bool,
}

impl Default for IkBone {
    fn default() -> Self {
        Self {
            id: 0,
            parent_id: marionette_anim::NO_PARENT,
            name: String::new(),
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            derived_rotation: Quat::IDENTITY,
            derived_position: Vec3::ZERO,
            derived_scale: Vec3::ONE,
            initial_rotation: Quat::IDENTITY,
            initial_position: Vec3::ZERO,
            initial_scale: Vec3::ONE,
            inverse_tpose: Mat4::IDENTITY,
            dirty: true,
        }
    }
}

impl IkBone {
    /// Local rotation
    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local position
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Local scale
    #[must_use]
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Cached object-space rotation; valid while not dirty
    #[must_use]
    pub const fn derived_rotation(&self) -> Quat {
        self.derived_rotation
    }

    /// Cached object-space position; valid while not dirty
    #[must_use]
    pub const fn derived_position(&self) -> Vec3 {
        self.derived_position
    }

    /// Cached object-space scale; valid while not dirty
    #[must_use]
    pub const fn derived_scale(&self) -> Vec3 {
        self.derived_scale
    }

    /// Inverse bind-pose matrix, opaque to the solver
    #[must_use]
    pub const fn inverse_tpose(&self) -> Mat4 {
        self.inverse_tpose
    }

    /// Whether any local mutation happened since the last [`update`](Self::update)
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set the local rotation; NaN degrades to identity, then normalized
    pub fn set_rotation(&mut self, q: Quat) {
        if q.is_nan() {
            tracing::warn!(bone = %self.name, "NaN rotation supplied, replaced with identity");
            self.rotation = Quat::IDENTITY;
        } else {
            self.rotation = normalize_quat(q);
        }
        self.dirty = true;
    }

    /// Set the local position; NaN degrades to zero
    pub fn set_position(&mut self, p: Vec3) {
        if p.is_nan() {
            tracing::warn!(bone = %self.name, "NaN position supplied, replaced with zero");
            self.position = Vec3::ZERO;
        } else {
            self.position = p;
        }
        self.dirty = true;
    }

    /// Set the local scale; NaN degrades to one
    pub fn set_scale(&mut self, s: Vec3) {
        if s.is_nan() {
            tracing::warn!(bone = %self.name, "NaN scale supplied, replaced with one");
            self.scale = Vec3::ONE;
        } else {
            self.scale = s;
        }
        self.dirty = true;
    }

    /// Multiply the local scale component-wise
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
        self.dirty = true;
    }

    /// Overwrite the cached derived rotation.
    ///
    /// Used to reimpose a stable world rotation after solving; the next
    /// [`update`](Self::update) would recompute it from the local transform.
    pub fn force_derived_rotation(&mut self, q: Quat) {
        self.derived_rotation = normalize_quat(q);
    }

    /// Translate in the given reference frame.
    ///
    /// `parent` is only consulted for [`TransformSpace::Object`].
    pub fn translate(&mut self, d: Vec3, space: TransformSpace, parent: Option<&Self>) {
        match space {
            TransformSpace::Local => {
                self.position += self.rotation * d;
            }
            TransformSpace::Object => {
                if let Some(parent) = parent {
                    self.position +=
                        (parent.derived_rotation.inverse() * d) / parent.derived_scale;
                } else {
                    self.position += d;
                }
            }
            TransformSpace::Arena => {
                self.position += d;
            }
        }
        self.dirty = true;
    }

    /// Rotate in the given reference frame.
    ///
    /// The quaternion is normalized first; the result is re-normalized so
    /// drift never accumulates over repeated calls.
    pub fn rotate(&mut self, q: Quat, space: TransformSpace) {
        let q = normalize_quat(q);

        self.rotation = match space {
            TransformSpace::Local => normalize_quat(self.rotation * q),
            TransformSpace::Object => normalize_quat(
                self.rotation * self.derived_rotation.inverse() * q * self.derived_rotation,
            ),
            TransformSpace::Arena => normalize_quat(q * self.rotation),
        };
        self.dirty = true;
    }

    /// Recompute the derived transform from the parent's derived transform
    pub fn update_derived_transform(&mut self, parent: Option<&Self>) {
        if let Some(parent) = parent {
            self.derived_rotation = normalize_quat(parent.derived_rotation * self.rotation);
            self.derived_scale = parent.derived_scale * self.scale;
            self.derived_position =
                parent.derived_position + parent.derived_rotation * (parent.derived_scale * self.position);
        } else {
            self.derived_rotation = self.rotation;
            self.derived_position = self.position;
            self.derived_scale = self.scale;
        }
    }

    /// Refresh the derived transform and clear the dirty flag
    pub fn update(&mut self, parent: Option<&Self>) {
        self.update_derived_transform(parent);
        self.dirty = false;
    }

    /// Record the current local transform as the initial pose
    pub fn set_as_initial_pose(&mut self) {
        self.initial_rotation = self.rotation;
        self.initial_position = self.position;
        self.initial_scale = self.scale;
    }

    /// Restore the local transform recorded by [`set_as_initial_pose`](Self::set_as_initial_pose)
    pub fn reset_to_initial_pose(&mut self) {
        self.rotation = self.initial_rotation;
        self.position = self.initial_position;
        self.scale = self.initial_scale;
        self.dirty = true;
    }

    /// Copy identity and transforms in from an animation-side bone
    pub fn copy_from(&mut self, bone: &Bone) {
        self.id = bone.id;
        self.parent_id = bone.parent_id;
        self.name.clone_from(&bone.name);
        self.rotation = bone.rotation;
        self.position = bone.position;
        self.scale = bone.scale;
        self.derived_rotation = bone.derived_rotation;
        self.derived_position = bone.derived_position;
        self.derived_scale = bone.derived_scale;
        self.inverse_tpose = bone.inverse_tpose;
        self.dirty = true;
    }

    /// Copy transforms back out to an animation-side bone
    pub fn copy_to(&self, bone: &mut Bone) {
        bone.rotation = self.rotation;
        bone.position = self.position;
        bone.scale = self.scale;
        bone.derived_rotation = self.derived_rotation;
        bone.derived_position = self.derived_position;
        bone.derived_scale = self.derived_scale;
    }
}
