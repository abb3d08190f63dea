//! Hand poses
//!
//! A pose is authored once as per-bone rotations in the universal frame
//! (`HandPoseDescriptor`), baked into a specific avatar's bone-local
//! rotations (`RuntimeHandPose`), then applied or blended every frame.

mod library;
mod runtime;

pub use library::{HandPoseCache, HandPoseLibrary};
pub use runtime::{bake_pose, blend, RuntimeHandDescriptor, RuntimeHandPose};

use glam::Quat;

use crate::hand::{Finger, FingerBone, HandInfo, Side};
use crate::skeleton::{BoneSet, UniversalAxes};
use crate::{Result, RigError};

/// Whether a pose is a single hand shape or an open/closed pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandPoseKind {
    Fixed,
    Blend,
}

/// Variant of a pose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendPoseType {
    /// The only variant of a fixed pose
    None,
    OpenGrip,
    ClosedGrip,
}

/// Universal-frame rotations of one finger, each relative to the previous
/// segment (the wrist for the first one present)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FingerDescriptor {
    pub metacarpal: Option<Quat>,
    pub proximal: Option<Quat>,
    pub intermediate: Option<Quat>,
    pub distal: Option<Quat>,
}

impl FingerDescriptor {
    /// Same rotation on proximal, intermediate and distal, metacarpal left out
    pub fn curl(rotation: Quat) -> Self {
        Self {
            metacarpal: None,
            proximal: Some(rotation),
            intermediate: Some(rotation),
            distal: Some(rotation),
        }
    }

    pub fn get(&self, bone: FingerBone) -> Option<Quat> {
        match bone {
            FingerBone::Metacarpal => self.metacarpal,
            FingerBone::Proximal => self.proximal,
            FingerBone::Intermediate => self.intermediate,
            FingerBone::Distal => self.distal,
        }
    }

    fn slot(&mut self, bone: FingerBone) -> &mut Option<Quat> {
        match bone {
            FingerBone::Metacarpal => &mut self.metacarpal,
            FingerBone::Proximal => &mut self.proximal,
            FingerBone::Intermediate => &mut self.intermediate,
            FingerBone::Distal => &mut self.distal,
        }
    }
}

/// Rig-independent shape of one hand
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandDescriptor {
    pub fingers: [FingerDescriptor; Finger::COUNT],
}

impl HandDescriptor {
    /// Every finger curled by the same rotation
    pub fn uniform(finger: FingerDescriptor) -> Self {
        Self {
            fingers: [finger; Finger::COUNT],
        }
    }

    #[inline]
    pub fn finger(&self, finger: Finger) -> &FingerDescriptor {
        &self.fingers[finger.index()]
    }

    /// Capture the skeleton's current finger pose in the universal frame.
    ///
    /// None when the hand has no wrist. Fingers or segments the hand lacks
    /// are left empty.
    pub fn compute(skeleton: &BoneSet, hand: &HandInfo) -> Option<Self> {
        let wrist = hand.wrist?;
        let wrist_rotation = skeleton.world_rotation(wrist)?;

        let mut descriptor = Self::default();
        for finger in Finger::ALL {
            let target = &mut descriptor.fingers[finger.index()];
            let mut parent: (Quat, &UniversalAxes) = (wrist_rotation, &hand.wrist_axes);
            for (kind, info) in hand.finger(finger).bones() {
                let Some(rotation) = skeleton.world_rotation(info.bone) else {
                    continue;
                };
                let relative = (parent.0.inverse() * rotation).normalize();
                *target.slot(kind) =
                    Some(UniversalAxes::to_universal(parent.1, &info.axes, relative));
                parent = (rotation, &info.axes);
            }
        }
        Some(descriptor)
    }
}

/// An authored hand pose for both hands
#[derive(Clone, Debug, PartialEq)]
pub struct HandPoseDescriptor {
    name: String,
    kind: HandPoseKind,
    variants: Vec<(Side, BlendPoseType, HandDescriptor)>,
}

impl HandPoseDescriptor {
    pub fn fixed(name: impl Into<String>, left: HandDescriptor, right: HandDescriptor) -> Self {
        Self {
            name: name.into(),
            kind: HandPoseKind::Fixed,
            variants: vec![
                (Side::Left, BlendPoseType::None, left),
                (Side::Right, BlendPoseType::None, right),
            ],
        }
    }

    /// Open/closed pair per hand: `(open, closed)`
    pub fn blend(
        name: impl Into<String>,
        left: (HandDescriptor, HandDescriptor),
        right: (HandDescriptor, HandDescriptor),
    ) -> Self {
        Self {
            name: name.into(),
            kind: HandPoseKind::Blend,
            variants: vec![
                (Side::Left, BlendPoseType::OpenGrip, left.0),
                (Side::Left, BlendPoseType::ClosedGrip, left.1),
                (Side::Right, BlendPoseType::OpenGrip, right.0),
                (Side::Right, BlendPoseType::ClosedGrip, right.1),
            ],
        }
    }

    /// Same hand shape on both sides. The universal frame already accounts
    /// for mirroring, so one descriptor serves both hands.
    pub fn symmetric_fixed(name: impl Into<String>, hand: HandDescriptor) -> Self {
        Self::fixed(name, hand, hand)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> HandPoseKind {
        self.kind
    }

    /// Variants this pose provides
    pub fn blend_types(&self) -> &'static [BlendPoseType] {
        match self.kind {
            HandPoseKind::Fixed => &[BlendPoseType::None],
            HandPoseKind::Blend => &[BlendPoseType::OpenGrip, BlendPoseType::ClosedGrip],
        }
    }

    /// Hand shape of one side and variant.
    ///
    /// Blend poses treat `BlendPoseType::None` as the open grip. Asking a
    /// fixed pose for a grip variant is an error.
    pub fn descriptor(&self, side: Side, blend_type: BlendPoseType) -> Result<&HandDescriptor> {
        let blend_type = match (self.kind, blend_type) {
            (HandPoseKind::Fixed, BlendPoseType::None) => BlendPoseType::None,
            (HandPoseKind::Fixed, _) => return Err(RigError::NotABlendPose(self.name.clone())),
            (HandPoseKind::Blend, BlendPoseType::None) => BlendPoseType::OpenGrip,
            (HandPoseKind::Blend, other) => other,
        };
        self.variants
            .iter()
            .find(|(s, t, _)| *s == side && *t == blend_type)
            .map(|(_, _, descriptor)| descriptor)
            .ok_or_else(|| RigError::UnknownPose(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use crate::hand::build_hand_info;
    use crate::testing::hand_rig;

    #[test]
    fn test_descriptor_lookup() {
        let open = HandDescriptor::uniform(FingerDescriptor::curl(Quat::from_rotation_x(0.1)));
        let closed = HandDescriptor::uniform(FingerDescriptor::curl(Quat::from_rotation_x(1.2)));
        let grab = HandPoseDescriptor::blend("grab", (open, closed), (open, closed));
        let flat = HandPoseDescriptor::symmetric_fixed("flat", HandDescriptor::default());

        assert_eq!(grab.kind(), HandPoseKind::Blend);
        assert_eq!(grab.descriptor(Side::Right, BlendPoseType::ClosedGrip).unwrap(), &closed);
        assert_eq!(grab.descriptor(Side::Left, BlendPoseType::None).unwrap(), &open);
        assert_eq!(flat.blend_types(), &[BlendPoseType::None]);
        assert!(matches!(
            flat.descriptor(Side::Left, BlendPoseType::OpenGrip),
            Err(RigError::NotABlendPose(_))
        ));
    }

    #[test]
    fn test_compute_rest_pose_is_identity() {
        let rig = hand_rig(Side::Right, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2), true);
        let hand = build_hand_info(
            &rig.skeleton,
            &rig.mesh,
            &rig.map,
            Side::Right,
            &RigConfig::default(),
        );

        let descriptor = HandDescriptor::compute(&rig.skeleton, &hand).unwrap();
        for finger in &descriptor.fingers {
            for bone in FingerBone::ALL {
                let rotation = finger.get(bone).unwrap();
                assert!(rotation.angle_between(Quat::IDENTITY) < 1e-4, "{:?}: {}", bone, rotation);
            }
        }
    }
}
