//! Rig configuration
//!
//! All tunables are flat fields with their defaults written out in `Default`.
//! There is no global instance: callers own a config and pass it where needed.

use glam::Vec3;

/// Rig build parameters (universal axes, finger metrics)
#[derive(Debug, Clone)]
pub struct RigConfig {
    // ========== Fingerprint ==========
    /// Position of the fingerprint along the distal bone, as a fraction of its length
    pub fingerprint_length_ratio: f32,
    /// Depth of the fingerprint below the distal bone axis, as a fraction of its radius
    pub fingerprint_radius_ratio: f32,

    // ========== Universal axes ==========
    /// World-space up reference used when no better hint exists (arms, hands without palm data)
    pub default_up_hint: Vec3,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            // Empirical values: the pad of the finger sits about two thirds
            // along the distal phalanx, slightly below its center line.
            fingerprint_length_ratio: 0.66,
            fingerprint_radius_ratio: 0.66,

            default_up_hint: Vec3::Y,
        }
    }
}

/// CCD solver parameters
#[derive(Debug, Clone, Copy)]
pub struct IkSolverSettings {
    /// Fixed iteration budget per solve. This is the dial for per-frame cost.
    pub max_iterations: u32,
    /// Effector-to-goal distance under which the chain counts as converged
    pub epsilon: f32,
    /// Restore the closest pose seen when the budget runs out
    pub restore_best: bool,
}

impl Default for IkSolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            epsilon: 1.0e-3,
            restore_best: true,
        }
    }
}

impl IkSolverSettings {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}
