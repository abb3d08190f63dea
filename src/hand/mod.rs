//! Hand and arm rig descriptors
//!
//! The host tells us which skeleton bones play which role through the bone
//! maps below; `build_hand_info` / `build_arm_info` then measure them.

mod arm_info;
mod finger_info;
mod hand_info;

pub use arm_info::{build_arm_info, ArmBoneInfo, ArmInfo};
pub use finger_info::{FingerBoneInfo, FingerInfo};
pub use hand_info::{build_hand_info, HandInfo};

/// Avatar side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// 0 for left, 1 for right
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Fingers in rig order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Finger {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Little = 4,
}

impl Finger {
    pub const COUNT: usize = 5;

    pub const ALL: [Finger; Self::COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Finger segments, root to tip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FingerBone {
    Metacarpal = 0,
    Proximal = 1,
    Intermediate = 2,
    Distal = 3,
}

impl FingerBone {
    pub const ALL: [FingerBone; 4] = [
        FingerBone::Metacarpal,
        FingerBone::Proximal,
        FingerBone::Intermediate,
        FingerBone::Distal,
    ];
}

// ============================================================================
// Bone maps
// ============================================================================

/// Skeleton bones of one finger. The metacarpal is optional on most rigs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerBoneMap {
    pub metacarpal: Option<usize>,
    pub proximal: Option<usize>,
    pub intermediate: Option<usize>,
    pub distal: Option<usize>,
}

impl FingerBoneMap {
    pub fn get(&self, bone: FingerBone) -> Option<usize> {
        match bone {
            FingerBone::Metacarpal => self.metacarpal,
            FingerBone::Proximal => self.proximal,
            FingerBone::Intermediate => self.intermediate,
            FingerBone::Distal => self.distal,
        }
    }
}

/// Skeleton bones of one hand
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandBoneMap {
    pub wrist: Option<usize>,
    pub fingers: [FingerBoneMap; Finger::COUNT],
}

impl HandBoneMap {
    #[inline]
    pub fn finger(&self, finger: Finger) -> &FingerBoneMap {
        &self.fingers[finger.index()]
    }
}

/// Skeleton bones of one arm, hand included
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArmBoneMap {
    pub clavicle: Option<usize>,
    pub upper_arm: Option<usize>,
    pub forearm: Option<usize>,
    pub hand: HandBoneMap,
}

/// Both arms of an avatar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvatarBoneMap {
    pub left: ArmBoneMap,
    pub right: ArmBoneMap,
}

impl AvatarBoneMap {
    #[inline]
    pub fn arm(&self, side: Side) -> &ArmBoneMap {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}
