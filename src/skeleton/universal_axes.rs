//! Universal bone axes
//!
//! Source skeletons disagree on which local axis points along a bone. A
//! `UniversalAxes` records, in the bone's own local space, which directions
//! play the role of forward (along the bone), up and right. Rotations
//! expressed relative to these frames can be moved between rigs.
//!
//! The frame is always a proper rotation (`right = up x forward`), so for a
//! mirrored pair of chains forward and up mirror while right flips.

use bitflags::bitflags;
use glam::{Mat3, Quat, Vec3};

use super::bone_set::BoneSet;
use crate::{Result, RigError};

const AXIS_EPSILON: f32 = 1.0e-4;
const ORTHOGONAL_TOLERANCE: f32 = 1.0e-3;

bitflags! {
    /// How a frame was obtained
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AxesFlags: u32 {
        /// Forward taken from the dominant child bone
        const FROM_CHILD = 1 << 0;
        /// Forward continues the parent-to-bone direction (leaf bones)
        const FROM_PARENT = 1 << 1;
        /// No orientation signal; identity frame returned
        const FALLBACK = 1 << 2;
        /// Up hint was parallel to forward, an alternate reference was used
        const ALTERNATE_UP = 1 << 3;
        /// Supplied by the host
        const EXPLICIT = 1 << 4;
    }
}

/// Forward/up/right of a bone, as unit vectors in the bone's local space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniversalAxes {
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub flags: AxesFlags,
}

impl Default for UniversalAxes {
    fn default() -> Self {
        Self::identity()
    }
}

impl UniversalAxes {
    /// Local axes already follow the universal convention (Z forward, Y up, X right)
    pub const fn identity() -> Self {
        Self {
            forward: Vec3::Z,
            up: Vec3::Y,
            right: Vec3::X,
            flags: AxesFlags::empty(),
        }
    }

    /// Frame from a known forward and up
    pub fn from_axes(forward: Vec3, up: Vec3) -> Result<Self> {
        let forward = forward.try_normalize().ok_or_else(|| {
            RigError::InvalidAxis(format!("forward {forward} has no length"))
        })?;
        let up = up
            .try_normalize()
            .ok_or_else(|| RigError::InvalidAxis(format!("up {up} has no length")))?;
        if forward.dot(up).abs() > ORTHOGONAL_TOLERANCE {
            return Err(RigError::InvalidAxis(format!(
                "forward {forward} and up {up} are not orthogonal"
            )));
        }
        let up = (up - forward * forward.dot(up)).normalize();
        Ok(Self {
            forward,
            up,
            right: up.cross(forward),
            flags: AxesFlags::EXPLICIT,
        })
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.flags.contains(AxesFlags::FALLBACK)
    }

    /// Rotation taking universal coordinates (x right, y up, z forward) to bone-local ones
    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_mat3(&Mat3::from_cols(self.right, self.up, self.forward)).normalize()
    }

    /// Express a child-to-parent local rotation between the two universal frames
    #[inline]
    pub fn to_universal(parent: &Self, child: &Self, local: Quat) -> Quat {
        (parent.rotation().inverse() * local * child.rotation()).normalize()
    }

    /// Inverse of `to_universal`: back to a child-to-parent local rotation
    #[inline]
    pub fn from_universal(parent: &Self, child: &Self, universal: Quat) -> Quat {
        (parent.rotation() * universal * child.rotation().inverse()).normalize()
    }
}

/// Universal axes of a bone using world +Y as the up reference
pub fn compute_universal_axes(skeleton: &BoneSet, bone: usize) -> UniversalAxes {
    compute_universal_axes_with_up(skeleton, bone, Vec3::Y)
}

/// Universal axes of a bone in the rest pose.
///
/// Forward points at the dominant child (or continues the parent-to-bone
/// direction for leaves), snapped to the closest local cardinal axis. Up is
/// the world-space `up_hint` brought into local space and snapped to the
/// closest cardinal axis perpendicular to forward.
pub fn compute_universal_axes_with_up(
    skeleton: &BoneSet,
    bone: usize,
    up_hint: Vec3,
) -> UniversalAxes {
    let Some(link) = skeleton.get(bone) else {
        log::warn!("[Rig] bone {} not in skeleton, using identity axes", bone);
        return fallback();
    };

    let (direction, mut flags) = match dominant_child_direction(skeleton, bone) {
        Some(direction) => (direction, AxesFlags::FROM_CHILD),
        None => match parent_direction(skeleton, bone) {
            Some(direction) => (direction, AxesFlags::FROM_PARENT),
            None => {
                log::warn!(
                    "[Rig] bone '{}' has no orientation signal, using identity axes",
                    link.name
                );
                return fallback();
            }
        },
    };
    let forward = snap_to_axis(direction);

    let to_local = skeleton
        .rest_world_rotation(bone)
        .unwrap_or(Quat::IDENTITY)
        .inverse();
    let mut up_local = reject(to_local * up_hint, forward);
    if up_local.length_squared() < AXIS_EPSILON * AXIS_EPSILON {
        let hint = up_hint.normalize_or_zero();
        let alternate = if hint.dot(Vec3::Z).abs() < 0.9 {
            Vec3::Z
        } else {
            Vec3::X
        };
        up_local = reject(to_local * alternate, forward);
        flags |= AxesFlags::ALTERNATE_UP;
    }
    let up = snap_to_axis(up_local);
    let right = up.cross(forward);

    UniversalAxes {
        forward,
        up,
        right,
        flags,
    }
}

fn fallback() -> UniversalAxes {
    UniversalAxes {
        flags: AxesFlags::FALLBACK,
        ..UniversalAxes::identity()
    }
}

/// Direction to the child farthest from the joint, in the bone's local space
fn dominant_child_direction(skeleton: &BoneSet, bone: usize) -> Option<Vec3> {
    skeleton
        .children(bone)
        .iter()
        .filter_map(|&child| skeleton.get(child))
        .map(|child| child.rest.translation)
        .filter(|offset| offset.length_squared() > AXIS_EPSILON * AXIS_EPSILON)
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
}

/// Parent-to-bone direction expressed in the bone's own local space
fn parent_direction(skeleton: &BoneSet, bone: usize) -> Option<Vec3> {
    let link = skeleton.get(bone)?;
    link.parent?;
    let offset = link.rest.translation;
    if offset.length_squared() <= AXIS_EPSILON * AXIS_EPSILON {
        return None;
    }
    Some(link.rest.rotation.inverse() * offset)
}

/// Component of `v` perpendicular to the unit vector `axis`
#[inline]
fn reject(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

/// Closest signed cardinal axis
fn snap_to_axis(v: Vec3) -> Vec3 {
    let abs = v.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::X * v.x.signum()
    } else if abs.y >= abs.z {
        Vec3::Y * v.y.signum()
    } else {
        Vec3::Z * v.z.signum()
    }
}
