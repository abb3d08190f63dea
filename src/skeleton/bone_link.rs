//! Bone node
//!
//! A BoneLink is one joint of the hierarchy. It keeps the rest-pose local
//! transform supplied by the host, the current local rotation written by
//! pose baking / IK, and the cached matrices derived from both.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};

use super::BoneTransform;

// ============================================================================
// Bone flags
// ============================================================================

bitflags! {
    /// Who last wrote the bone's local rotation
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BoneFlags: u32 {
        /// Rotation written by the CCD solver
        const IK_DRIVEN = 1 << 0;
        /// Rotation written by a baked hand pose
        const POSE_DRIVEN = 1 << 1;
    }
}

// ============================================================================
// Bone node
// ============================================================================

/// A single joint
///
/// Static data: name, parent, rest transform.
/// Dynamic data: current local rotation and the cached matrices
/// `local_to_world = parent.local_to_world * local_to_parent`.
#[derive(Clone, Debug)]
pub struct BoneLink {
    /// Bone name (unique within its set)
    pub name: String,

    /// Index inside the owning set
    pub(crate) internal_id: usize,

    /// Parent bone (None for roots)
    pub parent: Option<usize>,

    /// Drive flags
    pub flags: BoneFlags,

    /// Rest-pose transform relative to the parent
    pub rest: BoneTransform,

    /// Current local rotation (starts at the rest rotation)
    pub(crate) local_rotation: Quat,

    /// Local matrix (local_to_parent)
    pub(crate) local_to_parent: Mat4,

    /// Global matrix (local_to_world)
    pub(crate) local_to_world: Mat4,

    /// True when no other bone has this one as parent
    pub(crate) is_leaf: bool,
}

impl BoneLink {
    /// Create a new bone
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest: BoneTransform) -> Self {
        let local_to_parent = rest.to_matrix();
        Self {
            name: name.into(),
            internal_id: 0,
            parent,
            flags: BoneFlags::empty(),
            rest,
            local_rotation: rest.rotation,
            local_to_parent,
            local_to_world: local_to_parent,
            is_leaf: true,
        }
    }

    /// Create a root bone
    pub fn root(name: impl Into<String>, rest: BoneTransform) -> Self {
        Self::new(name, None, rest)
    }

    // ========================================
    // Accessors
    // ========================================

    #[inline]
    pub fn link_id(&self) -> usize {
        self.internal_id
    }

    #[inline]
    pub fn parent_id(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// World position
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.col(3).truncate()
    }

    /// World rotation
    #[inline]
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.local_to_world.to_scale_rotation_translation();
        rotation.normalize()
    }

    #[inline]
    pub fn local_rotation(&self) -> Quat {
        self.local_rotation
    }

    #[inline]
    pub fn rest_rotation(&self) -> Quat {
        self.rest.rotation
    }

    #[inline]
    pub fn rest_translation(&self) -> Vec3 {
        self.rest.translation
    }

    #[inline]
    pub fn global_transform(&self) -> Mat4 {
        self.local_to_world
    }

    #[inline]
    pub fn local_transform(&self) -> Mat4 {
        self.local_to_parent
    }

    // ========================================
    // Transform computation
    // ========================================

    /// Set the current local rotation. World matrices are refreshed by the owning set.
    #[inline]
    pub(crate) fn set_local_rotation(&mut self, rotation: Quat) {
        self.local_rotation = rotation.normalize();
        self.compute_local_transform();
    }

    /// Back to the rest rotation, clearing drive flags
    pub(crate) fn reset_to_rest(&mut self) {
        self.local_rotation = self.rest.rotation;
        self.flags = BoneFlags::empty();
        self.compute_local_transform();
    }

    /// Rebuild local_to_parent from the rest translation/scale and current rotation
    #[inline]
    pub(crate) fn compute_local_transform(&mut self) {
        self.local_to_parent = Mat4::from_scale_rotation_translation(
            self.rest.scale,
            self.local_rotation,
            self.rest.translation,
        );
    }

    /// Rotation relative to the rest pose, in the bone's rest frame
    #[inline]
    pub fn rotation_from_rest(&self) -> Quat {
        (self.rest.rotation.inverse() * self.local_rotation).normalize()
    }

    #[inline]
    pub fn is_ik_driven(&self) -> bool {
        self.flags.contains(BoneFlags::IK_DRIVEN)
    }

    #[inline]
    pub fn is_pose_driven(&self) -> bool {
        self.flags.contains(BoneFlags::POSE_DRIVEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bone_starts_at_rest() {
        let rest = BoneTransform::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.5));
        let bone = BoneLink::root("hips", rest);

        assert!(bone.is_root());
        assert!(bone.rotation_from_rest().abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert!(bone.position().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_reset_clears_flags_and_rotation() {
        let mut bone = BoneLink::new("elbow", Some(0), BoneTransform::default());
        bone.set_local_rotation(Quat::from_rotation_x(1.0));
        bone.flags.insert(BoneFlags::IK_DRIVEN);

        bone.reset_to_rest();

        assert!(!bone.is_ik_driven());
        assert_eq!(bone.local_rotation(), Quat::IDENTITY);
        assert_eq!(bone.local_transform(), Mat4::IDENTITY);
    }
}
