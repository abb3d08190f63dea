//! Skeleton system
//!
//! - BoneLink: a single joint with its rest pose and current local rotation
//! - BoneSet: the hierarchy, forward kinematics and ancestry queries
//! - UniversalAxes: per-bone forward/up/right convention shared across rigs
//! - IkSolver: constrained CCD chain solver

mod bone_link;
mod bone_set;
mod ik_solver;
mod universal_axes;

pub use bone_link::{BoneFlags, BoneLink};
pub use bone_set::BoneSet;
pub use ik_solver::{
    AngleLimits, IkChain, IkChainLink, IkConstraint, IkGoal, IkSolveResult, IkSolver,
    IkSolverState,
};
pub use universal_axes::{
    compute_universal_axes, compute_universal_axes_with_up, AxesFlags, UniversalAxes,
};

use glam::{Mat4, Quat, Vec3};

// ============================================================================
// Shared types
// ============================================================================

/// Local transform of a bone relative to its parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Decompose a matrix
    #[inline]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }
}
