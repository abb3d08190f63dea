//! Bone hierarchy
//!
//! Bones are stored parents-first so a single linear pass is a full forward
//! kinematics update.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use super::bone_link::{BoneFlags, BoneLink};
use crate::{Result, RigError};

/// Skeleton: ordered bones plus lookup caches
#[derive(Clone, Debug)]
pub struct BoneSet {
    bones: Vec<BoneLink>,
    children: Vec<Vec<usize>>,
    name_to_index: HashMap<String, usize>,
}

impl BoneSet {
    /// Build a skeleton from bones in topological order.
    ///
    /// Fails if a parent does not precede its child or a name repeats.
    pub fn new(mut bones: Vec<BoneLink>) -> Result<Self> {
        let count = bones.len();
        let mut children = vec![Vec::new(); count];
        let mut name_to_index = HashMap::with_capacity(count);

        for (index, bone) in bones.iter_mut().enumerate() {
            bone.internal_id = index;
            if let Some(parent) = bone.parent {
                if parent >= count {
                    return Err(RigError::BoneOutOfRange { bone: parent, count });
                }
                if parent >= index {
                    return Err(RigError::InvalidHierarchy { bone: index, parent });
                }
                children[parent].push(index);
            }
            if name_to_index.insert(bone.name.clone(), index).is_some() {
                return Err(RigError::DuplicateBoneName(bone.name.clone()));
            }
        }

        for (bone, kids) in bones.iter_mut().zip(&children) {
            bone.is_leaf = kids.is_empty();
        }

        let mut set = Self {
            bones,
            children,
            name_to_index,
        };
        set.update_world_transforms();
        Ok(set)
    }

    // ========================================
    // Queries
    // ========================================

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BoneLink> {
        self.bones.get(index)
    }

    #[inline]
    pub fn bones(&self) -> &[BoneLink] {
        &self.bones
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.bones.len()
    }

    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|b| b.parent)
    }

    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.bones.get(index).map(BoneLink::position)
    }

    pub fn world_rotation(&self, index: usize) -> Option<Quat> {
        self.bones.get(index).map(BoneLink::rotation)
    }

    pub fn world_matrix(&self, index: usize) -> Option<Mat4> {
        self.bones.get(index).map(|b| b.local_to_world)
    }

    pub fn local_rotation(&self, index: usize) -> Option<Quat> {
        self.bones.get(index).map(|b| b.local_rotation)
    }

    /// True if `ancestor` is `bone` or lies on its parent path
    pub fn is_ancestor(&self, ancestor: usize, bone: usize) -> bool {
        let mut current = Some(bone);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.parent(index);
        }
        false
    }

    /// Product of rest local rotations from just below `ancestor` down to `bone`.
    ///
    /// Maps `bone`'s rest frame into `ancestor`'s frame. Identity when both
    /// are the same bone, None when `ancestor` is not on the parent path.
    pub fn rest_rotation_between(&self, ancestor: usize, bone: usize) -> Option<Quat> {
        let mut rotation = Quat::IDENTITY;
        let mut current = bone;
        while current != ancestor {
            let link = self.bones.get(current)?;
            rotation = link.rest.rotation * rotation;
            current = link.parent?;
        }
        Some(rotation.normalize())
    }

    /// World rotation of a bone in the rest pose, regardless of the current pose
    pub fn rest_world_rotation(&self, index: usize) -> Option<Quat> {
        let mut rotation = self.bones.get(index)?.rest.rotation;
        let mut current = self.bones[index].parent;
        while let Some(parent) = current {
            let link = &self.bones[parent];
            rotation = link.rest.rotation * rotation;
            current = link.parent;
        }
        Some(rotation.normalize())
    }

    /// local_to_world of a bone in the rest pose
    pub fn rest_world_matrix(&self, index: usize) -> Option<Mat4> {
        let mut matrix = self.bones.get(index)?.rest.to_matrix();
        let mut current = self.bones[index].parent;
        while let Some(parent) = current {
            let link = &self.bones[parent];
            matrix = link.rest.to_matrix() * matrix;
            current = link.parent;
        }
        Some(matrix)
    }

    // ========================================
    // Pose updates
    // ========================================

    /// Set a bone's local rotation and refresh its subtree
    pub fn set_local_rotation(&mut self, index: usize, rotation: Quat) {
        if index >= self.bones.len() {
            return;
        }
        self.bones[index].set_local_rotation(rotation);
        self.update_world_transforms_from(index);
    }

    /// Same as `set_local_rotation` but also tags who wrote it
    pub(crate) fn drive_local_rotation(&mut self, index: usize, rotation: Quat, flags: BoneFlags) {
        if index >= self.bones.len() {
            return;
        }
        self.bones[index].flags.insert(flags);
        self.set_local_rotation(index, rotation);
    }

    /// Snapshot of every local rotation
    pub fn local_rotations(&self) -> Vec<Quat> {
        self.bones.iter().map(|b| b.local_rotation).collect()
    }

    /// Restore a snapshot taken with `local_rotations`
    pub fn restore_local_rotations(&mut self, rotations: &[Quat]) -> Result<()> {
        if rotations.len() != self.bones.len() {
            return Err(RigError::MismatchedLength {
                what: "local rotation snapshot",
                expected: self.bones.len(),
                actual: rotations.len(),
            });
        }
        for (bone, rotation) in self.bones.iter_mut().zip(rotations) {
            bone.set_local_rotation(*rotation);
        }
        self.update_world_transforms();
        Ok(())
    }

    /// Put every bone back to its rest pose
    pub fn reset_to_rest(&mut self) {
        for bone in &mut self.bones {
            bone.reset_to_rest();
        }
        self.update_world_transforms();
    }

    /// Full forward kinematics pass
    pub fn update_world_transforms(&mut self) {
        for index in 0..self.bones.len() {
            self.update_single(index);
        }
    }

    /// Refresh a bone and all of its descendants
    pub fn update_world_transforms_from(&mut self, index: usize) {
        if index >= self.bones.len() {
            return;
        }
        self.update_single(index);
        // Children always have higher indices; walk the subtree with an explicit stack.
        let mut stack: Vec<usize> = self.children[index].clone();
        while let Some(child) = stack.pop() {
            self.update_single(child);
            stack.extend_from_slice(&self.children[child]);
        }
    }

    fn update_single(&mut self, index: usize) {
        let parent_global = match self.bones[index].parent {
            Some(parent) => self.bones[parent].local_to_world,
            None => Mat4::IDENTITY,
        };
        let bone = &mut self.bones[index];
        bone.local_to_world = parent_global * bone.local_to_parent;
    }
}
