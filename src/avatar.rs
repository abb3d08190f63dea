//! Avatar rig
//!
//! Owns one avatar's skeleton together with everything solved from it: hand
//! and arm descriptors and the poses baked for this rig. The host drives it
//! from its per-frame update and reads the resulting local rotations back.

use crate::config::RigConfig;
use crate::hand::{build_arm_info, build_hand_info, ArmInfo, AvatarBoneMap, HandInfo, Side};
use crate::mesh::SkinnedMesh;
use crate::pose::{HandPoseCache, HandPoseLibrary};
use crate::skeleton::BoneSet;
use crate::{Result, RigError};

pub struct AvatarRig {
    skeleton: BoneSet,
    bone_map: AvatarBoneMap,
    /// Indexed by `Side::index`
    hands: [HandInfo; 2],
    arms: [ArmInfo; 2],
    pose_cache: HandPoseCache,
}

impl AvatarRig {
    /// Solve universal axes and metrics for every mapped bone.
    ///
    /// Fails if the bone map names a bone outside the skeleton. Missing
    /// (unmapped) bones are fine and only reduce what the rig can do.
    pub fn build(
        skeleton: BoneSet,
        mesh: &SkinnedMesh,
        bone_map: AvatarBoneMap,
        config: &RigConfig,
    ) -> Result<Self> {
        validate_bone_map(&skeleton, &bone_map)?;

        let mut rig = Self {
            skeleton,
            bone_map,
            hands: [HandInfo::empty(Side::Left), HandInfo::empty(Side::Right)],
            arms: [ArmInfo::empty(Side::Left), ArmInfo::empty(Side::Right)],
            pose_cache: HandPoseCache::new(),
        };
        rig.solve(mesh, config);
        Ok(rig)
    }

    /// Re-solve axes and metrics, e.g. after the mesh changed. Baked poses are dropped.
    pub fn rebuild(&mut self, mesh: &SkinnedMesh, config: &RigConfig) {
        self.pose_cache.clear();
        self.solve(mesh, config);
    }

    fn solve(&mut self, mesh: &SkinnedMesh, config: &RigConfig) {
        for side in Side::ALL {
            let arm = self.bone_map.arm(side);
            let index = side.index();
            self.hands[index] = build_hand_info(&self.skeleton, mesh, &arm.hand, side, config);
            self.arms[index] = build_arm_info(&self.skeleton, arm, side, config);
        }
        log::info!(
            "[Rig] avatar rig solved: {} bones, left hand {}, right hand {}",
            self.skeleton.len(),
            if self.hands[0].has_full_hand_data() { "complete" } else { "partial" },
            if self.hands[1].has_full_hand_data() { "complete" } else { "partial" },
        );
    }

    // ========================================
    // Accessors
    // ========================================

    #[inline]
    pub fn skeleton(&self) -> &BoneSet {
        &self.skeleton
    }

    /// Mutable skeleton, for the host to write animation and for IK solves
    #[inline]
    pub fn skeleton_mut(&mut self) -> &mut BoneSet {
        &mut self.skeleton
    }

    #[inline]
    pub fn bone_map(&self) -> &AvatarBoneMap {
        &self.bone_map
    }

    #[inline]
    pub fn hand(&self, side: Side) -> &HandInfo {
        &self.hands[side.index()]
    }

    #[inline]
    pub fn arm(&self, side: Side) -> &ArmInfo {
        &self.arms[side.index()]
    }

    #[inline]
    pub fn pose_cache(&self) -> &HandPoseCache {
        &self.pose_cache
    }

    // ========================================
    // Hand poses
    // ========================================

    /// Put a hand in a named pose. Blend poses use `blend_value` (0 open, 1 closed).
    pub fn set_hand_pose(
        &mut self,
        library: &HandPoseLibrary,
        side: Side,
        name: &str,
        blend_value: f32,
    ) -> Result<()> {
        self.blend_hand_pose(library, side, name, blend_value, 1.0)
    }

    /// Move a hand toward a named pose by `weight` in [0, 1], for transitions
    pub fn blend_hand_pose(
        &mut self,
        library: &HandPoseLibrary,
        side: Side,
        name: &str,
        blend_value: f32,
        weight: f32,
    ) -> Result<()> {
        let pose = self
            .pose_cache
            .get_or_bake(library, name, &self.skeleton, &self.hands)?;
        if let Some(descriptor) = pose.evaluate(side, blend_value) {
            descriptor.apply_weighted(&mut self.skeleton, weight);
        }
        Ok(())
    }
}

fn validate_bone_map(skeleton: &BoneSet, map: &AvatarBoneMap) -> Result<()> {
    let count = skeleton.len();
    for side in Side::ALL {
        let arm = map.arm(side);
        let hand = &arm.hand;
        let bones = [arm.clavicle, arm.upper_arm, arm.forearm, hand.wrist]
            .into_iter()
            .chain(hand.fingers.iter().flat_map(|f| {
                [f.metacarpal, f.proximal, f.intermediate, f.distal]
            }))
            .flatten();
        for bone in bones {
            if bone >= count {
                return Err(RigError::BoneOutOfRange { bone, count });
            }
        }
    }
    Ok(())
}
