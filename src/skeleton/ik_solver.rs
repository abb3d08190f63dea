//! CCD IK solver
//!
//! - Iterative: each iteration sweeps the chain from effector to root
//! - Per-link constraints: free, single hinge axis, or two axes, with optional angle limits
//! - Per-link weight for partial participation
//! - Optional goal orientation on links flagged `align_to_goal`
//!
//! Constraint angles are measured on the link's rotation relative to its
//! rest local rotation, about axes given in the bone's rest frame.

use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};

use super::bone_link::BoneFlags;
use super::bone_set::BoneSet;
use crate::config::IkSolverSettings;
use crate::{Result, RigError};

const AXIS_TOLERANCE: f32 = 1.0e-3;
const DIRECTION_EPSILON: f32 = 1.0e-6;
const ANGLE_EPSILON: f32 = 1.0e-5;

// ============================================================================
// Chain description
// ============================================================================

/// Angle range in radians
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleLimits {
    pub min: f32,
    pub max: f32,
}

impl AngleLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn from_degrees(min: f32, max: f32) -> Self {
        Self::new(min.to_radians(), max.to_radians())
    }

    #[inline]
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.max(self.min).min(self.max)
    }

    /// How far `angle` lies outside the range, 0 inside
    #[inline]
    pub fn excess(&self, angle: f32) -> f32 {
        (self.min - angle).max(angle - self.max).max(0.0)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    #[inline]
    pub fn contains(&self, angle: f32, tolerance: f32) -> bool {
        angle >= self.min - tolerance && angle <= self.max + tolerance
    }
}

/// Rotational freedom of a link
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IkConstraint {
    /// Ball joint
    None,
    /// Hinge about one axis
    SingleAxis {
        axis: Vec3,
        limits: Option<AngleLimits>,
    },
    /// Rotation `R(axis1, a) * R(axis2, b)`; twist about `axis1 x axis2` is removed
    TwoAxes {
        axis1: Vec3,
        axis2: Vec3,
        limits1: Option<AngleLimits>,
        limits2: Option<AngleLimits>,
    },
}

impl IkConstraint {
    pub fn single_axis(axis: Vec3, limits: Option<AngleLimits>) -> Self {
        Self::SingleAxis { axis, limits }
    }

    pub fn two_axes(
        axis1: Vec3,
        axis2: Vec3,
        limits1: Option<AngleLimits>,
        limits2: Option<AngleLimits>,
    ) -> Self {
        Self::TwoAxes {
            axis1,
            axis2,
            limits1,
            limits2,
        }
    }

    /// Project a rest-relative rotation onto the allowed set and clamp its angles
    pub fn constrain(&self, rotation: Quat) -> Quat {
        match *self {
            IkConstraint::None => rotation,
            IkConstraint::SingleAxis { axis, limits } => {
                let angle = twist_angle(rotation, axis);
                let angle = limits.map_or(angle, |l| l.clamp(angle));
                Quat::from_axis_angle(axis, angle)
            }
            IkConstraint::TwoAxes {
                axis1,
                axis2,
                limits1,
                limits2,
            } => {
                let (a, b) = two_axis_angles(rotation, axis1, axis2, limits1, limits2);
                let a = limits1.map_or(a, |l| l.clamp(a));
                let b = limits2.map_or(b, |l| l.clamp(b));
                Quat::from_axis_angle(axis1, a) * Quat::from_axis_angle(axis2, b)
            }
        }
    }

    /// Angles of a rest-relative rotation about the constraint axes.
    /// The second entry is 0 for single-axis constraints; None for free links.
    pub fn angles(&self, rotation: Quat) -> Option<[f32; 2]> {
        match *self {
            IkConstraint::None => None,
            IkConstraint::SingleAxis { axis, .. } => Some([twist_angle(rotation, axis), 0.0]),
            IkConstraint::TwoAxes {
                axis1,
                axis2,
                limits1,
                limits2,
            } => {
                let (a, b) = two_axis_angles(rotation, axis1, axis2, limits1, limits2);
                Some([a, b])
            }
        }
    }

    /// True if the rotation's angles lie within the configured limits
    pub fn within_limits(&self, rotation: Quat, tolerance: f32) -> bool {
        match *self {
            IkConstraint::None => true,
            IkConstraint::SingleAxis { axis, limits } => {
                limits.map_or(true, |l| l.contains(twist_angle(rotation, axis), tolerance))
            }
            IkConstraint::TwoAxes {
                axis1,
                axis2,
                limits1,
                limits2,
            } => {
                let (a, b) = two_axis_angles(rotation, axis1, axis2, limits1, limits2);
                limits1.map_or(true, |l| l.contains(a, tolerance))
                    && limits2.map_or(true, |l| l.contains(b, tolerance))
            }
        }
    }
}

/// One joint of a chain
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkChainLink {
    pub bone: usize,
    /// 0 turns the link into a pass-through, 1 applies the full correction
    pub weight: f32,
    pub constraint: IkConstraint,
    /// Also rotate toward the goal orientation after the positional step
    pub align_to_goal: bool,
}

impl IkChainLink {
    pub fn new(bone: usize) -> Self {
        Self {
            bone,
            weight: 1.0,
            constraint: IkConstraint::None,
            align_to_goal: false,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_constraint(mut self, constraint: IkConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_align_to_goal(mut self, align: bool) -> Self {
        self.align_to_goal = align;
        self
    }
}

/// Validated link list, ordered root to effector
#[derive(Clone, Debug)]
pub struct IkChain {
    links: Vec<IkChainLink>,
    effector: usize,
}

impl IkChain {
    /// Validate and normalize a chain.
    ///
    /// Fails on out-of-range bones, links that are not a strict ancestor path
    /// ending at (or above) the effector, weights outside [0, 1], zero or
    /// non-orthogonal axes and inverted limits.
    pub fn new(skeleton: &BoneSet, links: Vec<IkChainLink>, effector: usize) -> Result<Self> {
        let count = skeleton.len();
        if effector >= count {
            return Err(RigError::BoneOutOfRange { bone: effector, count });
        }

        let mut normalized = Vec::with_capacity(links.len());
        for (index, link) in links.into_iter().enumerate() {
            if link.bone >= count {
                return Err(RigError::BoneOutOfRange { bone: link.bone, count });
            }
            if !(0.0..=1.0).contains(&link.weight) {
                return Err(RigError::InvalidWeight {
                    link: index,
                    weight: link.weight,
                });
            }
            let constraint = validate_constraint(index, link.constraint)?;
            normalized.push(IkChainLink { constraint, ..link });
        }

        for pair in normalized.windows(2) {
            let (parent, child) = (pair[0].bone, pair[1].bone);
            if parent == child || !skeleton.is_ancestor(parent, child) {
                return Err(RigError::BrokenChain {
                    bone: parent,
                    descendant: child,
                });
            }
        }
        if let Some(last) = normalized.last() {
            if !skeleton.is_ancestor(last.bone, effector) {
                return Err(RigError::BrokenChain {
                    bone: last.bone,
                    descendant: effector,
                });
            }
        }

        Ok(Self {
            links: normalized,
            effector,
        })
    }

    #[inline]
    pub fn links(&self) -> &[IkChainLink] {
        &self.links
    }

    #[inline]
    pub fn effector(&self) -> usize {
        self.effector
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Change a link's weight at runtime, e.g. to temporarily disable a joint.
    /// Finite weights are clamped to [0, 1]; NaN and infinities are rejected.
    pub fn set_weight(&mut self, link: usize, weight: f32) -> Result<()> {
        if !weight.is_finite() {
            return Err(RigError::InvalidWeight { link, weight });
        }
        if let Some(l) = self.links.get_mut(link) {
            l.weight = weight.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Constraint angles of a link in the skeleton's current pose
    pub fn link_angles(&self, skeleton: &BoneSet, link: usize) -> Option<[f32; 2]> {
        let l = self.links.get(link)?;
        let bone = skeleton.get(l.bone)?;
        l.constraint.angles(bone.rotation_from_rest())
    }
}

fn validate_constraint(link: usize, constraint: IkConstraint) -> Result<IkConstraint> {
    let unit = |axis: Vec3| {
        axis.try_normalize().ok_or_else(|| {
            RigError::InvalidAxis(format!("IK link {link}: axis {axis} has no length"))
        })
    };
    let check_limits = |limits: Option<AngleLimits>| match limits {
        Some(l) if !l.is_finite() || l.min > l.max => Err(RigError::InvalidLimits {
            link,
            min: l.min,
            max: l.max,
        }),
        _ => Ok(()),
    };

    match constraint {
        IkConstraint::None => Ok(constraint),
        IkConstraint::SingleAxis { axis, limits } => {
            check_limits(limits)?;
            Ok(IkConstraint::SingleAxis {
                axis: unit(axis)?,
                limits,
            })
        }
        IkConstraint::TwoAxes {
            axis1,
            axis2,
            limits1,
            limits2,
        } => {
            check_limits(limits1)?;
            check_limits(limits2)?;
            let (axis1, axis2) = (unit(axis1)?, unit(axis2)?);
            if axis1.dot(axis2).abs() > AXIS_TOLERANCE {
                return Err(RigError::InvalidAxis(format!(
                    "IK link {link}: axes {axis1} and {axis2} are not orthogonal"
                )));
            }
            Ok(IkConstraint::TwoAxes {
                axis1,
                axis2,
                limits1,
                limits2,
            })
        }
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Goal for the effector
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkGoal {
    pub position: Vec3,
    /// World orientation used by links with `align_to_goal`
    pub rotation: Option<Quat>,
}

impl IkGoal {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }
}

/// Solver state machine: Idle -> Iterating -> {Converged | MaxIterationsReached}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IkSolverState {
    #[default]
    Idle,
    Iterating,
    Converged,
    MaxIterationsReached,
}

/// Outcome of one `solve` call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkSolveResult {
    pub state: IkSolverState,
    pub iterations: u32,
    /// Effector-to-goal distance after the solve
    pub distance: f32,
}

impl IkSolveResult {
    #[inline]
    pub fn converged(&self) -> bool {
        self.state == IkSolverState::Converged
    }
}

/// CCD solver for one chain
#[derive(Clone, Debug)]
pub struct IkSolver {
    pub chain: IkChain,
    pub settings: IkSolverSettings,
    pub enabled: bool,
    state: IkSolverState,
}

impl IkSolver {
    pub fn new(chain: IkChain, settings: IkSolverSettings) -> Self {
        Self {
            chain,
            settings,
            enabled: true,
            state: IkSolverState::Idle,
        }
    }

    /// State reached by the last solve
    #[inline]
    pub fn state(&self) -> IkSolverState {
        self.state
    }

    /// Drive the chain toward `goal`, writing local rotations into `skeleton`.
    ///
    /// Deterministic: a fixed iteration budget, no time cutoff.
    pub fn solve(&mut self, skeleton: &mut BoneSet, goal: &IkGoal) -> IkSolveResult {
        let effector = self.chain.effector;
        let mut distance = effector_distance(skeleton, effector, goal.position);

        if !self.enabled {
            return self.finish(IkSolverState::Idle, 0, distance);
        }
        if !goal.position.is_finite() || goal.rotation.is_some_and(|r| !r.is_finite()) {
            log::warn!("[IK] effector {}: non-finite goal ignored", effector);
            return self.finish(IkSolverState::Idle, 0, distance);
        }
        if self.chain.is_empty() || distance < self.settings.epsilon {
            return self.finish(IkSolverState::Converged, 0, distance);
        }

        self.state = IkSolverState::Iterating;
        let mut best_distance = distance;
        let mut best_rotations = self.link_rotations(skeleton);

        for iteration in 0..self.settings.max_iterations {
            self.solve_iteration(skeleton, goal);

            distance = effector_distance(skeleton, effector, goal.position);
            if distance < best_distance {
                best_distance = distance;
                best_rotations = self.link_rotations(skeleton);
            }
            if distance < self.settings.epsilon {
                return self.finish(IkSolverState::Converged, iteration + 1, distance);
            }
        }

        if self.settings.restore_best && best_distance < distance {
            for (link, rotation) in self.chain.links.iter().zip(&best_rotations) {
                skeleton.set_local_rotation(link.bone, *rotation);
            }
            distance = best_distance;
        }

        self.finish(
            IkSolverState::MaxIterationsReached,
            self.settings.max_iterations,
            distance,
        )
    }

    fn finish(&mut self, state: IkSolverState, iterations: u32, distance: f32) -> IkSolveResult {
        self.state = state;
        log::debug!(
            "[IK] effector {} -> {:?} after {} iterations, residual {:.5}",
            self.chain.effector,
            state,
            iterations,
            distance
        );
        IkSolveResult {
            state,
            iterations,
            distance,
        }
    }

    fn link_rotations(&self, skeleton: &BoneSet) -> Vec<Quat> {
        self.chain
            .links
            .iter()
            .map(|link| skeleton.local_rotation(link.bone).unwrap_or(Quat::IDENTITY))
            .collect()
    }

    /// One CCD sweep, effector to root
    fn solve_iteration(&self, skeleton: &mut BoneSet, goal: &IkGoal) {
        for link in self.chain.links.iter().rev() {
            if link.weight <= 0.0 {
                continue;
            }
            self.solve_link_position(skeleton, link, goal.position);
            if let (true, Some(rotation)) = (link.align_to_goal, goal.rotation) {
                self.align_link(skeleton, link, rotation);
            }
        }
    }

    /// Rotate one link so the effector swings toward the goal
    fn solve_link_position(&self, skeleton: &mut BoneSet, link: &IkChainLink, goal: Vec3) {
        let Some(bone) = skeleton.get(link.bone) else {
            return;
        };
        let Some(effector) = skeleton.world_position(self.chain.effector) else {
            return;
        };

        let to_local = bone.global_transform().inverse();
        let local_effector = to_local.transform_point3(effector);
        let local_goal = to_local.transform_point3(goal);
        let current = bone.rotation_from_rest();
        let rest = bone.rest_rotation();

        let constrained = match link.constraint {
            IkConstraint::SingleAxis { axis, limits } => {
                // Hinge: work in the plane perpendicular to the axis
                let local_axis = current.inverse() * axis;
                let from = reject(local_effector, local_axis);
                let to = reject(local_goal, local_axis);
                let (Some(from), Some(to)) = (normalized(from), normalized(to)) else {
                    return;
                };
                let delta = local_axis.dot(from.cross(to)).atan2(from.dot(to));
                let angle = wrap_angle(twist_angle(current, axis) + delta * link.weight);
                let angle = limits.map_or(angle, |l| l.clamp(angle));
                Quat::from_axis_angle(axis, angle)
            }
            IkConstraint::None | IkConstraint::TwoAxes { .. } => {
                let (Some(from), Some(to)) = (normalized(local_effector), normalized(local_goal))
                else {
                    return;
                };
                let delta = Quat::IDENTITY.slerp(Quat::from_rotation_arc(from, to), link.weight);
                link.constraint.constrain(current * delta)
            }
        };

        skeleton.drive_local_rotation(link.bone, rest * constrained, BoneFlags::IK_DRIVEN);
    }

    /// Rotate one link so the effector's world orientation approaches `goal_rotation`
    fn align_link(&self, skeleton: &mut BoneSet, link: &IkChainLink, goal_rotation: Quat) {
        let (Some(bone), Some(effector_rotation)) = (
            skeleton.get(link.bone),
            skeleton.world_rotation(self.chain.effector),
        ) else {
            return;
        };

        let correction = (goal_rotation * effector_rotation.inverse()).normalize();
        let correction = Quat::IDENTITY.slerp(correction, link.weight);
        let parent_rotation = bone
            .parent_id()
            .and_then(|p| skeleton.world_rotation(p))
            .unwrap_or(Quat::IDENTITY);

        let local = parent_rotation.inverse() * correction * bone.rotation();
        let rest = bone.rest_rotation();
        let constrained = link.constraint.constrain((rest.inverse() * local).normalize());

        skeleton.drive_local_rotation(link.bone, rest * constrained, BoneFlags::IK_DRIVEN);
    }
}

// ============================================================================
// Math helpers
// ============================================================================

fn effector_distance(skeleton: &BoneSet, effector: usize, goal: Vec3) -> f32 {
    skeleton
        .world_position(effector)
        .map_or(f32::MAX, |p| p.distance(goal))
}

#[inline]
fn reject(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

#[inline]
fn normalized(v: Vec3) -> Option<Vec3> {
    if v.length_squared() < DIRECTION_EPSILON * DIRECTION_EPSILON {
        None
    } else {
        v.try_normalize()
    }
}

/// Wrap to (-PI, PI]
fn wrap_angle(angle: f32) -> f32 {
    let mut r = angle % TAU;
    if r > PI {
        r -= TAU;
    } else if r <= -PI {
        r += TAU;
    }
    r
}

/// Signed rotation angle of `q` about the unit `axis` (swing-twist decomposition)
fn twist_angle(q: Quat, axis: Vec3) -> f32 {
    let q = if q.w < 0.0 { -q } else { q };
    let projection = Vec3::new(q.x, q.y, q.z).dot(axis);
    wrap_angle(2.0 * projection.atan2(q.w))
}

/// `(a, b)` such that `R(axis1, a) * R(axis2, b)` best matches `q`, read from
/// where `q` sends `axis1 x axis2`.
///
/// Every direction has two readings, `(a, b)` with `|b| <= PI/2` and
/// `(a + PI, PI - b)`. The one closer to the limits wins, then the one
/// closer to `q`.
fn two_axis_angles(
    q: Quat,
    axis1: Vec3,
    axis2: Vec3,
    limits1: Option<AngleLimits>,
    limits2: Option<AngleLimits>,
) -> (f32, f32) {
    let reference = axis1.cross(axis2);
    let d = q * reference;
    let b = d.dot(axis1).clamp(-1.0, 1.0).asin();
    let a = (-d.dot(axis2)).atan2(d.dot(reference));

    let candidates = [(a, b), (wrap_angle(a + PI), wrap_angle(PI - b))];
    let score = |(a, b): (f32, f32)| {
        let excess = limits1.map_or(0.0, |l| l.excess(a)) + limits2.map_or(0.0, |l| l.excess(b));
        let rebuilt = Quat::from_axis_angle(axis1, a) * Quat::from_axis_angle(axis2, b);
        (excess, rebuilt.angle_between(q))
    };
    let (first, second) = (score(candidates[0]), score(candidates[1]));
    if second.0 < first.0 - ANGLE_EPSILON
        || ((second.0 - first.0).abs() <= ANGLE_EPSILON && second.1 < first.1)
    {
        candidates[1]
    } else {
        candidates[0]
    }
}
