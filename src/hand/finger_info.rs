//! Per-finger measurements

use glam::Vec3;

use super::{FingerBone, FingerBoneMap};
use crate::config::RigConfig;
use crate::mesh::{compute_bone_metrics, BoneMetrics, SkinnedMesh};
use crate::skeleton::{compute_universal_axes_with_up, BoneSet, UniversalAxes};

/// One measured finger segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerBoneInfo {
    pub bone: usize,
    pub axes: UniversalAxes,
    pub metrics: BoneMetrics,
}

/// A finger chain, metacarpal (optional) to distal
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FingerInfo {
    pub metacarpal: Option<FingerBoneInfo>,
    pub proximal: Option<FingerBoneInfo>,
    pub intermediate: Option<FingerBoneInfo>,
    pub distal: Option<FingerBoneInfo>,
    /// Fingertip in distal-bone local space
    pub tip_local_position: Option<Vec3>,
    /// Finger pad contact point in distal-bone local space
    pub fingerprint_local_position: Option<Vec3>,
}

impl FingerInfo {
    /// Proximal, intermediate and distal are present. The metacarpal is optional.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.proximal.is_some() && self.intermediate.is_some() && self.distal.is_some()
    }

    pub fn bone(&self, bone: FingerBone) -> Option<&FingerBoneInfo> {
        match bone {
            FingerBone::Metacarpal => self.metacarpal.as_ref(),
            FingerBone::Proximal => self.proximal.as_ref(),
            FingerBone::Intermediate => self.intermediate.as_ref(),
            FingerBone::Distal => self.distal.as_ref(),
        }
    }

    /// Present segments, root to tip
    pub fn bones(&self) -> impl Iterator<Item = (FingerBone, &FingerBoneInfo)> + '_ {
        FingerBone::ALL
            .into_iter()
            .filter_map(move |kind| self.bone(kind).map(|info| (kind, info)))
    }

    /// Measure a finger. `up_hint` is the world-space back-of-hand direction.
    pub(crate) fn build(
        skeleton: &BoneSet,
        mesh: &SkinnedMesh,
        map: &FingerBoneMap,
        up_hint: Vec3,
        config: &RigConfig,
    ) -> Self {
        let chain: Vec<(FingerBone, usize)> = FingerBone::ALL
            .into_iter()
            .filter_map(|kind| map.get(kind).map(|bone| (kind, bone)))
            .filter(|(_, bone)| skeleton.contains(*bone))
            .collect();

        let mut info = FingerInfo::default();
        for (position, &(kind, bone)) in chain.iter().enumerate() {
            let next = chain.get(position + 1).map(|&(_, next)| next);
            let axes = compute_universal_axes_with_up(skeleton, bone, up_hint);
            let metrics = compute_bone_metrics(skeleton, mesh, bone, next, &axes);
            let measured = Some(FingerBoneInfo { bone, axes, metrics });
            match kind {
                FingerBone::Metacarpal => info.metacarpal = measured,
                FingerBone::Proximal => info.proximal = measured,
                FingerBone::Intermediate => info.intermediate = measured,
                FingerBone::Distal => info.distal = measured,
            }
        }

        if let Some(distal) = info.distal.filter(|d| d.metrics.has_data()) {
            let (axes, metrics) = (distal.axes, distal.metrics);
            info.tip_local_position = Some(axes.forward * metrics.length);
            info.fingerprint_local_position = Some(
                axes.forward * (config.fingerprint_length_ratio * metrics.length)
                    - axes.up * (config.fingerprint_radius_ratio * metrics.radius),
            );
        }

        info
    }
}
