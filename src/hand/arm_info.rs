//! Arm descriptor and its IK chain

use super::{ArmBoneMap, Side};
use crate::config::RigConfig;
use crate::skeleton::{
    compute_universal_axes_with_up, AngleLimits, BoneSet, IkChain, IkChainLink, IkConstraint,
    UniversalAxes,
};
use crate::{Result, RigError};

/// An arm bone with its universal frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmBoneInfo {
    pub bone: usize,
    pub axes: UniversalAxes,
}

/// Measured arm of one side
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmInfo {
    pub side: Side,
    pub clavicle: Option<ArmBoneInfo>,
    pub upper_arm: Option<ArmBoneInfo>,
    pub forearm: Option<ArmBoneInfo>,
    pub hand: Option<ArmBoneInfo>,
    /// Shoulder to elbow, rest pose. 0 when either end is missing.
    pub upper_arm_length: f32,
    /// Elbow to wrist, rest pose. 0 when either end is missing.
    pub forearm_length: f32,
}

impl ArmInfo {
    pub fn empty(side: Side) -> Self {
        Self {
            side,
            clavicle: None,
            upper_arm: None,
            forearm: None,
            hand: None,
            upper_arm_length: 0.0,
            forearm_length: 0.0,
        }
    }

    /// Upper arm, forearm and hand present. The clavicle is optional.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.upper_arm.is_some() && self.forearm.is_some() && self.hand.is_some()
    }

    /// Shoulder to wrist distance with the arm straight
    #[inline]
    pub fn reach(&self) -> f32 {
        self.upper_arm_length + self.forearm_length
    }

    /// Three-link CCD chain driving the hand.
    ///
    /// The shoulder is free, the elbow bends about the forearm's up axis and
    /// the wrist rotates about its up then right axes and follows the goal
    /// orientation.
    pub fn ik_chain(
        &self,
        skeleton: &BoneSet,
        elbow_limits: AngleLimits,
        wrist_limits: (AngleLimits, AngleLimits),
    ) -> Result<IkChain> {
        let upper_arm = self.upper_arm.ok_or(RigError::MissingBone("upper arm"))?;
        let forearm = self.forearm.ok_or(RigError::MissingBone("forearm"))?;
        let hand = self.hand.ok_or(RigError::MissingBone("hand"))?;

        let links = vec![
            IkChainLink::new(upper_arm.bone),
            IkChainLink::new(forearm.bone).with_constraint(IkConstraint::single_axis(
                forearm.axes.up,
                Some(elbow_limits),
            )),
            IkChainLink::new(hand.bone)
                .with_constraint(IkConstraint::two_axes(
                    hand.axes.up,
                    hand.axes.right,
                    Some(wrist_limits.0),
                    Some(wrist_limits.1),
                ))
                .with_align_to_goal(true),
        ];
        IkChain::new(skeleton, links, hand.bone)
    }
}

/// Resolve an arm's universal frames and segment lengths from its bone map
pub fn build_arm_info(
    skeleton: &BoneSet,
    map: &ArmBoneMap,
    side: Side,
    config: &RigConfig,
) -> ArmInfo {
    let resolve = |bone: Option<usize>| {
        bone.filter(|&b| skeleton.contains(b)).map(|bone| ArmBoneInfo {
            bone,
            axes: compute_universal_axes_with_up(skeleton, bone, config.default_up_hint),
        })
    };
    let segment_length = |from: Option<ArmBoneInfo>, to: Option<ArmBoneInfo>| {
        let from = skeleton.rest_world_matrix(from?.bone)?.col(3).truncate();
        let to = skeleton.rest_world_matrix(to?.bone)?.col(3).truncate();
        Some(from.distance(to))
    };

    let mut info = ArmInfo::empty(side);
    info.clavicle = resolve(map.clavicle);
    info.upper_arm = resolve(map.upper_arm);
    info.forearm = resolve(map.forearm);
    info.hand = resolve(map.hand.wrist);
    info.upper_arm_length = segment_length(info.upper_arm, info.forearm).unwrap_or(0.0);
    info.forearm_length = segment_length(info.forearm, info.hand).unwrap_or(0.0);

    if !info.has_data() {
        log::warn!("[Rig] {:?} arm is missing upper arm, forearm or hand", side);
    }
    info
}
