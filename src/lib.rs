//! Avatar rig core
//!
//! Engine-agnostic rig solving for VR avatars:
//! - skeleton: bone hierarchy, universal axes, constrained CCD IK
//! - mesh: skin influence data and per-bone metrics
//! - hand: finger/hand/arm descriptors built from skeleton + mesh
//! - pose: rig-independent hand poses, baking and open/closed blending
//! - avatar: owner of all of the above for a single avatar instance

pub mod avatar;
pub mod config;
pub mod hand;
pub mod mesh;
pub mod pose;
pub mod skeleton;

#[cfg(test)]
mod testing;

pub use avatar::AvatarRig;
pub use config::{IkSolverSettings, RigConfig};
pub use hand::{
    build_arm_info, build_hand_info, ArmBoneInfo, ArmBoneMap, ArmInfo, AvatarBoneMap, Finger,
    FingerBone, FingerBoneInfo, FingerBoneMap, FingerInfo, HandBoneMap, HandInfo, Side,
};
pub use mesh::{compute_bone_metrics, Aabb, BoneMetrics, SkinnedMesh, VertexWeights};
pub use pose::{
    bake_pose, blend, BlendPoseType, FingerDescriptor, HandDescriptor, HandPoseCache,
    HandPoseDescriptor, HandPoseKind, HandPoseLibrary, RuntimeHandDescriptor, RuntimeHandPose,
};
pub use skeleton::{
    compute_universal_axes, compute_universal_axes_with_up, AngleLimits, AxesFlags, BoneLink,
    BoneSet, BoneTransform, IkChain, IkChainLink, IkConstraint, IkGoal, IkSolveResult, IkSolver,
    IkSolverState, UniversalAxes,
};

use thiserror::Error;

/// Rig construction errors.
///
/// Only malformed input is reported here. Steady-state geometry queries
/// return `Option`/status values instead.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("bone {bone} is out of range (skeleton has {count} bones)")]
    BoneOutOfRange { bone: usize, count: usize },

    #[error("bone {bone} references parent {parent}, parents must precede their children")]
    InvalidHierarchy { bone: usize, parent: usize },

    #[error("duplicate bone name '{0}'")]
    DuplicateBoneName(String),

    #[error("{what}: expected {expected} entries, got {actual}")]
    MismatchedLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    #[error("IK link {link}: angle limits min {min} > max {max}")]
    InvalidLimits { link: usize, min: f32, max: f32 },

    #[error("IK link {link}: weight {weight} outside [0, 1]")]
    InvalidWeight { link: usize, weight: f32 },

    #[error("IK chain is broken: bone {bone} is not an ancestor of bone {descendant}")]
    BrokenChain { bone: usize, descendant: usize },

    #[error("missing bone: {0}")]
    MissingBone(&'static str),

    #[error("unknown hand pose '{0}'")]
    UnknownPose(String),

    #[error("hand pose '{0}' is not a blend pose")]
    NotABlendPose(String),
}

pub type Result<T> = std::result::Result<T, RigError>;
