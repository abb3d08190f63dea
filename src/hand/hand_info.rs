//! Hand descriptor: wrist frame plus five measured fingers

use glam::Vec3;

use super::{Finger, FingerInfo, HandBoneMap, Side};
use crate::config::RigConfig;
use crate::mesh::SkinnedMesh;
use crate::skeleton::{compute_universal_axes_with_up, BoneSet, UniversalAxes};

/// Measured hand of one side
#[derive(Clone, Debug, PartialEq)]
pub struct HandInfo {
    pub side: Side,
    pub wrist: Option<usize>,
    pub wrist_axes: UniversalAxes,
    /// Thumb, index, middle, ring, little
    pub fingers: [FingerInfo; Finger::COUNT],
}

impl HandInfo {
    /// Hand with no bones assigned
    pub fn empty(side: Side) -> Self {
        Self {
            side,
            wrist: None,
            wrist_axes: UniversalAxes::identity(),
            fingers: [FingerInfo::default(); Finger::COUNT],
        }
    }

    /// Wrist present and every finger has proximal, intermediate and distal
    pub fn has_full_hand_data(&self) -> bool {
        self.wrist.is_some() && self.fingers.iter().all(FingerInfo::has_data)
    }

    #[inline]
    pub fn finger(&self, finger: Finger) -> &FingerInfo {
        &self.fingers[finger.index()]
    }

    /// Universal axes of any bone that belongs to this hand
    pub fn bone_axes(&self, bone: usize) -> Option<&UniversalAxes> {
        if self.wrist == Some(bone) {
            return Some(&self.wrist_axes);
        }
        self.fingers
            .iter()
            .flat_map(|finger| finger.bones())
            .find(|(_, info)| info.bone == bone)
            .map(|(_, info)| &info.axes)
    }

    /// Center of the palm in world space, current pose.
    ///
    /// Averages the wrist origin with the index and little proximal joints,
    /// working in wrist space. None if any of the three is missing.
    pub fn palm_center(&self, skeleton: &BoneSet) -> Option<Vec3> {
        let (wrist, index, little) = self.palm_bones()?;
        let wrist_matrix = skeleton.world_matrix(wrist)?;
        let to_wrist = wrist_matrix.inverse();
        let index_local = to_wrist.transform_point3(skeleton.world_position(index)?);
        let little_local = to_wrist.transform_point3(skeleton.world_position(little)?);

        let center_local = (Vec3::ZERO + index_local + little_local) / 3.0;
        Some(wrist_matrix.transform_point3(center_local))
    }

    /// World direction pointing out of the palm, current pose
    pub fn palm_out_direction(&self, skeleton: &BoneSet) -> Option<Vec3> {
        let (wrist, index, little) = self.palm_bones()?;
        palm_out(
            skeleton.world_position(wrist)?,
            skeleton.world_position(index)?,
            skeleton.world_position(little)?,
            self.side,
        )
    }

    /// Fingertip in world space, current pose
    pub fn finger_tip_position(&self, skeleton: &BoneSet, finger: Finger) -> Option<Vec3> {
        let info = self.finger(finger);
        let distal = info.distal?;
        let local = info.tip_local_position?;
        Some(skeleton.world_matrix(distal.bone)?.transform_point3(local))
    }

    /// Finger pad contact point in world space, current pose
    pub fn finger_print_position(&self, skeleton: &BoneSet, finger: Finger) -> Option<Vec3> {
        let info = self.finger(finger);
        let distal = info.distal?;
        let local = info.fingerprint_local_position?;
        Some(skeleton.world_matrix(distal.bone)?.transform_point3(local))
    }

    fn palm_bones(&self) -> Option<(usize, usize, usize)> {
        let index = self.finger(Finger::Index).proximal?.bone;
        let little = self.finger(Finger::Little).proximal?.bone;
        Some((self.wrist?, index, little))
    }
}

/// Normal of the wrist/index/little triangle, flipped for the right hand so
/// both sides point away from the palm
fn palm_out(wrist: Vec3, index: Vec3, little: Vec3, side: Side) -> Option<Vec3> {
    let normal = (index - wrist).cross(little - wrist).try_normalize()?;
    Some(match side {
        Side::Left => normal,
        Side::Right => -normal,
    })
}

/// Measure a hand from its bone map.
///
/// Fingers use the back of the hand (`-palm_out` in the rest pose) as their
/// up reference, falling back to `config.default_up_hint` when the palm
/// cannot be resolved.
pub fn build_hand_info(
    skeleton: &BoneSet,
    mesh: &SkinnedMesh,
    map: &HandBoneMap,
    side: Side,
    config: &RigConfig,
) -> HandInfo {
    let rest_position = |bone: Option<usize>| {
        bone.and_then(|b| skeleton.rest_world_matrix(b))
            .map(|m| m.col(3).truncate())
    };

    let wrist = map.wrist.filter(|&w| skeleton.contains(w));
    let rest_palm_out = match (
        rest_position(wrist),
        rest_position(map.finger(Finger::Index).proximal),
        rest_position(map.finger(Finger::Little).proximal),
    ) {
        (Some(w), Some(i), Some(l)) => palm_out(w, i, l, side),
        _ => None,
    };
    let up_hint = match rest_palm_out {
        Some(out) => -out,
        None => {
            log::warn!(
                "[Rig] {:?} hand: palm unresolved, using default up hint {}",
                side,
                config.default_up_hint
            );
            config.default_up_hint
        }
    };

    let mut info = HandInfo::empty(side);
    info.wrist = wrist;
    if let Some(wrist) = wrist {
        info.wrist_axes = compute_universal_axes_with_up(skeleton, wrist, up_hint);
    }
    for finger in Finger::ALL {
        info.fingers[finger.index()] =
            FingerInfo::build(skeleton, mesh, map.finger(finger), up_hint, config);
    }

    if !info.has_full_hand_data() {
        let missing: Vec<Finger> = Finger::ALL
            .into_iter()
            .filter(|&f| !info.finger(f).has_data())
            .collect();
        log::warn!(
            "[Rig] {:?} hand incomplete: wrist {}, fingers missing data {:?}",
            side,
            if info.wrist.is_some() { "present" } else { "missing" },
            missing
        );
    }

    info
}
