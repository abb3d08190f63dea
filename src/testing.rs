//! Synthetic rigs shared by unit tests

use glam::{Quat, Vec3};

use crate::hand::{ArmBoneMap, AvatarBoneMap, Finger, FingerBoneMap, HandBoneMap, Side};
use crate::mesh::{SkinnedMesh, VertexWeights};
use crate::skeleton::{BoneLink, BoneSet, BoneTransform};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Same rotation up to quaternion sign
pub fn quat_close(a: Quat, b: Quat, max_abs_diff: f32) -> bool {
    a.abs_diff_eq(b, max_abs_diff) || a.abs_diff_eq(-b, max_abs_diff)
}

/// Points of a box running `length` along `direction` from `start`, `half`
/// thick on both sides
pub fn box_points(start: Vec3, direction: Vec3, length: f32, half: f32) -> Vec<Vec3> {
    let direction = direction.normalize();
    let abs = direction.abs();
    let (p1, p2) = if abs.x >= abs.y && abs.x >= abs.z {
        (Vec3::Y, Vec3::Z)
    } else if abs.y >= abs.z {
        (Vec3::X, Vec3::Z)
    } else {
        (Vec3::X, Vec3::Y)
    };

    let mut points = Vec::with_capacity(12);
    for along in [0.0, 0.5, 1.0] {
        for (s1, s2) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)] {
            points.push(start + direction * (length * along) + p1 * (half * s1) + p2 * (half * s2));
        }
    }
    points
}

// ============================================================================
// Rig builder
// ============================================================================

/// Builds skeletons from world-space placements
#[derive(Default)]
pub struct RigBuilder {
    bones: Vec<BoneLink>,
    world: Vec<(Vec3, Quat)>,
    positions: Vec<Vec3>,
    weights: Vec<VertexWeights>,
}

impl RigBuilder {
    pub fn add(
        &mut self,
        name: &str,
        parent: Option<usize>,
        position: Vec3,
        rotation: Quat,
    ) -> usize {
        let rest = match parent {
            Some(p) => {
                let (parent_position, parent_rotation) = self.world[p];
                let to_parent = parent_rotation.inverse();
                BoneTransform::new(to_parent * (position - parent_position), to_parent * rotation)
            }
            None => BoneTransform::new(position, rotation),
        };
        self.bones.push(BoneLink::new(name, parent, rest));
        self.world.push((position, rotation));
        self.bones.len() - 1
    }

    /// World position a bone was placed at
    pub fn position(&self, bone: usize) -> Vec3 {
        self.world[bone].0
    }

    /// Skin a box from `bone` toward `to`
    pub fn skin_segment(&mut self, bone: usize, to: Vec3, half: f32) {
        let from = self.position(bone);
        let points = box_points(from, to - from, from.distance(to), half);
        self.weights
            .extend(std::iter::repeat(VertexWeights::single(bone as u32)).take(points.len()));
        self.positions.extend(points);
    }

    pub fn build(self) -> (BoneSet, SkinnedMesh) {
        (
            BoneSet::new(self.bones).unwrap(),
            SkinnedMesh::new(self.positions, self.weights).unwrap(),
        )
    }
}

// ============================================================================
// Arm chain
// ============================================================================

pub struct ArmBones {
    pub shoulder: usize,
    pub elbow: usize,
    pub wrist: usize,
    pub tip: usize,
}

impl ArmBones {
    /// Shoulder to tip, fully stretched
    pub fn reach(&self) -> f32 {
        0.65
    }
}

/// Straight arm along +X: shoulder at the origin, elbow 0.3, wrist 0.55, tip 0.65
pub fn arm_chain_skeleton() -> (BoneSet, ArmBones) {
    let mut rig = RigBuilder::default();
    let root = rig.add("root", None, Vec3::ZERO, Quat::IDENTITY);
    let shoulder = rig.add("shoulder", Some(root), Vec3::ZERO, Quat::IDENTITY);
    let elbow = rig.add("elbow", Some(shoulder), Vec3::new(0.3, 0.0, 0.0), Quat::IDENTITY);
    let wrist = rig.add("wrist", Some(elbow), Vec3::new(0.55, 0.0, 0.0), Quat::IDENTITY);
    let tip = rig.add("tip", Some(wrist), Vec3::new(0.65, 0.0, 0.0), Quat::IDENTITY);
    let (skeleton, _) = rig.build();
    (
        skeleton,
        ArmBones {
            shoulder,
            elbow,
            wrist,
            tip,
        },
    )
}

// ============================================================================
// Hands
// ============================================================================

pub const FINGER_HALF_THICKNESS: f32 = 0.008;
pub const DISTAL_LENGTH: f32 = 0.02;

/// Sideways offset of each finger on a left hand, thumb first
const FINGER_OFFSETS: [f32; Finger::COUNT] = [0.03, 0.02, 0.0, -0.02, -0.035];

/// Add a hand under `parent`.
///
/// In hand space the fingers run along +Z and the palm faces -Y; right hands
/// mirror X. `placement` orients the hand in the world and every bone ends up
/// with world rotation `placement * convention`.
pub fn add_hand(
    rig: &mut RigBuilder,
    parent: usize,
    wrist_position: Vec3,
    placement: Quat,
    side: Side,
    convention: Quat,
    with_metacarpals: bool,
) -> HandBoneMap {
    let rotation = placement * convention;
    let at = |local: Vec3| wrist_position + placement * local;
    let prefix = match side {
        Side::Left => "l",
        Side::Right => "r",
    };
    let mirror = match side {
        Side::Left => 1.0,
        Side::Right => -1.0,
    };

    let wrist = rig.add(&format!("{prefix}_wrist"), Some(parent), wrist_position, rotation);
    let mut map = HandBoneMap {
        wrist: Some(wrist),
        ..Default::default()
    };

    for finger in Finger::ALL {
        let x = FINGER_OFFSETS[finger.index()] * mirror;
        let name = |segment: &str| format!("{prefix}_{finger:?}_{segment}");
        let mut fingers = FingerBoneMap::default();

        let mut parent = wrist;
        if with_metacarpals {
            let position = at(Vec3::new(x * 0.5, 0.0, 0.03));
            let metacarpal = rig.add(&name("meta"), Some(wrist), position, rotation);
            fingers.metacarpal = Some(metacarpal);
            parent = metacarpal;
        }
        let joint = |z: f32| at(Vec3::new(x, 0.0, z));
        let proximal = rig.add(&name("prox"), Some(parent), joint(0.07), rotation);
        let intermediate = rig.add(&name("mid"), Some(proximal), joint(0.105), rotation);
        let distal = rig.add(&name("dist"), Some(intermediate), joint(0.13), rotation);

        if let Some(metacarpal) = fingers.metacarpal {
            rig.skin_segment(metacarpal, joint(0.07), FINGER_HALF_THICKNESS);
        }
        rig.skin_segment(proximal, joint(0.105), FINGER_HALF_THICKNESS);
        rig.skin_segment(intermediate, joint(0.13), FINGER_HALF_THICKNESS);
        rig.skin_segment(distal, joint(0.13 + DISTAL_LENGTH), FINGER_HALF_THICKNESS);

        fingers.proximal = Some(proximal);
        fingers.intermediate = Some(intermediate);
        fingers.distal = Some(distal);
        map.fingers[finger.index()] = fingers;
    }
    map
}

pub struct HandRig {
    pub skeleton: BoneSet,
    pub mesh: SkinnedMesh,
    pub map: HandBoneMap,
}

/// A lone hand at the origin under a forearm bone, fingers along +Z
pub fn hand_rig(side: Side, convention: Quat, with_metacarpals: bool) -> HandRig {
    let mut rig = RigBuilder::default();
    let forearm = rig.add("forearm", None, Vec3::new(0.0, 0.0, -0.25), convention);
    let map = add_hand(
        &mut rig,
        forearm,
        Vec3::ZERO,
        Quat::IDENTITY,
        side,
        convention,
        with_metacarpals,
    );
    let (skeleton, mesh) = rig.build();
    HandRig {
        skeleton,
        mesh,
        map,
    }
}

// ============================================================================
// Avatar
// ============================================================================

pub struct AvatarFixture {
    pub skeleton: BoneSet,
    pub mesh: SkinnedMesh,
    pub map: AvatarBoneMap,
}

/// T-pose avatar, arms along -X (left) and +X (right), palms down
pub fn avatar_fixture() -> AvatarFixture {
    avatar_fixture_with(Quat::IDENTITY)
}

/// T-pose avatar whose hand bones use `hand_convention` as local axes
pub fn avatar_fixture_with(hand_convention: Quat) -> AvatarFixture {
    let mut rig = RigBuilder::default();
    let hips = rig.add("hips", None, Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
    let chest = rig.add("chest", Some(hips), Vec3::new(0.0, 1.4, 0.0), Quat::IDENTITY);

    let mut arm = |side: Side| {
        let (outward, placement) = match side {
            Side::Left => (-1.0, Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2)),
            Side::Right => (1.0, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        };
        let along = |x: f32| Vec3::new(x * outward, 1.4, 0.0);
        let prefix = match side {
            Side::Left => "l",
            Side::Right => "r",
        };

        let name = |bone: &str| format!("{prefix}_{bone}");
        let clavicle = rig.add(&name("clavicle"), Some(chest), along(0.05), Quat::IDENTITY);
        let upper_arm = rig.add(&name("upper_arm"), Some(clavicle), along(0.15), Quat::IDENTITY);
        let forearm = rig.add(&name("forearm"), Some(upper_arm), along(0.43), Quat::IDENTITY);
        rig.skin_segment(upper_arm, along(0.43), 0.04);
        rig.skin_segment(forearm, along(0.68), 0.03);
        let hand = add_hand(
            &mut rig,
            forearm,
            along(0.68),
            placement,
            side,
            hand_convention,
            false,
        );

        ArmBoneMap {
            clavicle: Some(clavicle),
            upper_arm: Some(upper_arm),
            forearm: Some(forearm),
            hand,
        }
    };
    let left = arm(Side::Left);
    let right = arm(Side::Right);

    let (skeleton, mesh) = rig.build();
    AvatarFixture {
        skeleton,
        mesh,
        map: AvatarBoneMap { left, right },
    }
}
