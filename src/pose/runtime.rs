//! Baked poses: bone-local rotations of one avatar

use glam::Quat;

use super::{BlendPoseType, HandDescriptor, HandPoseDescriptor, HandPoseKind};
use crate::hand::{Finger, FingerBone, HandInfo, Side};
use crate::skeleton::{BoneFlags, BoneSet, UniversalAxes};
use crate::Result;

/// Bone-local rotations for one hand of one avatar
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeHandDescriptor {
    /// `(bone, local rotation)` in finger order
    pub rotations: Vec<(usize, Quat)>,
}

impl RuntimeHandDescriptor {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    pub fn rotation(&self, bone: usize) -> Option<Quat> {
        self.rotations
            .iter()
            .find(|(b, _)| *b == bone)
            .map(|(_, rotation)| *rotation)
    }

    /// Write the rotations into the skeleton
    pub fn apply(&self, skeleton: &mut BoneSet) {
        for &(bone, rotation) in &self.rotations {
            skeleton.drive_local_rotation(bone, rotation, BoneFlags::POSE_DRIVEN);
        }
    }

    /// Move the skeleton's current rotations toward this pose by `weight` in [0, 1].
    /// A non-finite weight leaves the skeleton untouched.
    pub fn apply_weighted(&self, skeleton: &mut BoneSet, weight: f32) {
        if !weight.is_finite() || weight <= 0.0 {
            return;
        }
        if weight >= 1.0 {
            self.apply(skeleton);
            return;
        }
        for &(bone, rotation) in &self.rotations {
            let Some(current) = skeleton.local_rotation(bone) else {
                continue;
            };
            let blended = current.slerp(rotation, weight).normalize();
            skeleton.drive_local_rotation(bone, blended, BoneFlags::POSE_DRIVEN);
        }
    }
}

/// Interpolate two baked hand shapes bone by bone.
///
/// `t <= 0` returns `open` and `t >= 1` returns `closed` unchanged, NaN
/// counts as 0. Bones present in only one of the two keep that rotation.
pub fn blend(
    open: &RuntimeHandDescriptor,
    closed: &RuntimeHandDescriptor,
    t: f32,
) -> RuntimeHandDescriptor {
    if t.is_nan() || t <= 0.0 {
        return open.clone();
    }
    if t >= 1.0 {
        return closed.clone();
    }

    let mut rotations: Vec<(usize, Quat)> = open
        .rotations
        .iter()
        .map(|&(bone, from)| match closed.rotation(bone) {
            Some(to) => (bone, from.slerp(to, t).normalize()),
            None => (bone, from),
        })
        .collect();
    rotations.extend(
        closed
            .rotations
            .iter()
            .filter(|(bone, _)| open.rotation(*bone).is_none())
            .copied(),
    );
    RuntimeHandDescriptor { rotations }
}

/// Bake one variant of a pose onto a hand
pub fn bake_pose(
    skeleton: &BoneSet,
    hand: &HandInfo,
    pose: &HandPoseDescriptor,
    blend_type: BlendPoseType,
) -> Result<RuntimeHandDescriptor> {
    let descriptor = pose.descriptor(hand.side, blend_type)?;
    Ok(bake_hand(skeleton, hand, descriptor))
}

/// Change of basis from universal-frame rotations to this avatar's bone-local
/// rotations.
///
/// Each finger is walked root to tip. A segment the descriptor rotates but
/// the avatar lacks is folded into the next segment the avatar has. A segment
/// the descriptor leaves out is not written, and the next one is solved
/// relative to the last written bone (or the wrist) through the rest pose.
fn bake_hand(
    skeleton: &BoneSet,
    hand: &HandInfo,
    descriptor: &HandDescriptor,
) -> RuntimeHandDescriptor {
    let mut baked = RuntimeHandDescriptor::default();
    let Some(wrist) = hand.wrist else {
        log::debug!("[Pose] {:?} hand has no wrist, nothing to bake", hand.side);
        return baked;
    };

    for finger in Finger::ALL {
        let source = descriptor.finger(finger);
        let target = hand.finger(finger);
        let mut parent: (usize, &UniversalAxes) = (wrist, &hand.wrist_axes);
        let mut pending = Quat::IDENTITY;

        for kind in FingerBone::ALL {
            let Some(universal) = source.get(kind) else {
                continue;
            };
            let universal = (pending * universal).normalize();
            let Some(info) = target.bone(kind) else {
                log::debug!(
                    "[Pose] {:?} {:?} {:?} not in rig, folded into the next segment",
                    hand.side,
                    finger,
                    kind
                );
                pending = universal;
                continue;
            };
            pending = Quat::IDENTITY;

            // Rotation from the skeletal parent's frame to the parent we solve against
            let Some(between) = skeleton
                .parent(info.bone)
                .and_then(|p| skeleton.rest_rotation_between(parent.0, p))
            else {
                log::debug!(
                    "[Pose] bone {} is not below bone {}, skipped",
                    info.bone,
                    parent.0
                );
                continue;
            };

            let relative = UniversalAxes::from_universal(parent.1, &info.axes, universal);
            baked
                .rotations
                .push((info.bone, (between.inverse() * relative).normalize()));
            parent = (info.bone, &info.axes);
        }
    }
    baked
}

/// A pose baked for one avatar, every variant and both hands
#[derive(Clone, Debug)]
pub struct RuntimeHandPose {
    name: String,
    kind: HandPoseKind,
    variants: Vec<(Side, BlendPoseType, RuntimeHandDescriptor)>,
}

impl RuntimeHandPose {
    /// Bake every variant of `pose` for the given hands (indexed by `Side::index`)
    pub fn bake(
        skeleton: &BoneSet,
        hands: &[HandInfo; 2],
        pose: &HandPoseDescriptor,
    ) -> Result<Self> {
        let mut variants = Vec::with_capacity(4);
        for side in Side::ALL {
            for &blend_type in pose.blend_types() {
                let descriptor = bake_pose(skeleton, &hands[side.index()], pose, blend_type)?;
                variants.push((side, blend_type, descriptor));
            }
        }
        log::debug!("[Pose] baked '{}' ({} variants)", pose.name(), variants.len());
        Ok(Self {
            name: pose.name().to_owned(),
            kind: pose.kind(),
            variants,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> HandPoseKind {
        self.kind
    }

    pub fn descriptor(
        &self,
        side: Side,
        blend_type: BlendPoseType,
    ) -> Option<&RuntimeHandDescriptor> {
        self.variants
            .iter()
            .find(|(s, t, _)| *s == side && *t == blend_type)
            .map(|(_, _, descriptor)| descriptor)
    }

    /// Hand shape for `side`. Blend poses interpolate open to closed by
    /// `blend_value`, fixed poses ignore it.
    pub fn evaluate(&self, side: Side, blend_value: f32) -> Option<RuntimeHandDescriptor> {
        match self.kind {
            HandPoseKind::Fixed => self.descriptor(side, BlendPoseType::None).cloned(),
            HandPoseKind::Blend => {
                let open = self.descriptor(side, BlendPoseType::OpenGrip)?;
                let closed = self.descriptor(side, BlendPoseType::ClosedGrip)?;
                Some(blend(open, closed, blend_value))
            }
        }
    }
}
