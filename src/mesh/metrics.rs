//! Per-bone size metrics from skin influence

use crate::mesh::{Aabb, SkinnedMesh};
use crate::skeleton::{BoneSet, UniversalAxes};

/// Length and thickness of a bone
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneMetrics {
    pub bone: usize,
    pub length: f32,
    pub radius: f32,
    /// Number of vertices whose dominant influence is this bone
    pub vertex_count: usize,
}

impl BoneMetrics {
    /// Degenerate metrics: no influenced vertices, length and radius zero
    pub fn empty(bone: usize) -> Self {
        Self {
            bone,
            ..Default::default()
        }
    }

    /// False when no vertex is influenced by the bone. Dependent computations should skip it.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.vertex_count > 0
    }
}

/// Measure a bone from the vertices it dominates, in its rest-pose local space.
///
/// * length: distance to `next_bone` when given, otherwise how far the
///   influenced volume reaches along `axes.forward` from the joint.
/// * radius: half the larger of the volume's extents along `axes.right` and `axes.up`.
pub fn compute_bone_metrics(
    skeleton: &BoneSet,
    mesh: &SkinnedMesh,
    bone: usize,
    next_bone: Option<usize>,
    axes: &UniversalAxes,
) -> BoneMetrics {
    let Some(bone_matrix) = skeleton.rest_world_matrix(bone) else {
        return BoneMetrics::empty(bone);
    };
    let world_to_bone = bone_matrix.inverse();

    let mut vertex_count = 0;
    let bounds = Aabb::from_points(mesh.vertices_influenced_by(bone).map(|v| {
        vertex_count += 1;
        world_to_bone.transform_point3(v)
    }));
    let Some(bounds) = bounds else {
        log::debug!("[Metrics] bone {} has no influenced vertices", bone);
        return BoneMetrics::empty(bone);
    };

    let next_position = next_bone
        .and_then(|next| skeleton.rest_world_matrix(next))
        .map(|m| m.col(3).truncate());
    let length = match next_position {
        Some(next) => bone_matrix.col(3).truncate().distance(next),
        None => bounds
            .corners()
            .iter()
            .map(|corner| corner.dot(axes.forward))
            .fold(0.0_f32, f32::max),
    };
    let radius = 0.5
        * bounds
            .projected_extent(axes.right)
            .max(bounds.projected_extent(axes.up));

    BoneMetrics {
        bone,
        length,
        radius,
        vertex_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VertexWeights;
    use crate::skeleton::{compute_universal_axes, BoneLink, BoneTransform};
    use crate::testing::box_points;
    use glam::{EulerRot, Quat, Vec3};
    use proptest::prelude::*;

    fn two_bones(convention: Quat) -> BoneSet {
        BoneSet::new(vec![
            BoneLink::root("a", BoneTransform::new(Vec3::new(1.0, 0.0, 0.0), convention)),
            BoneLink::new(
                "b",
                Some(0),
                BoneTransform::new(convention.inverse() * Vec3::Z * 0.04, Quat::IDENTITY),
            ),
        ])
        .unwrap()
    }

    fn finger_mesh() -> SkinnedMesh {
        // Bone a spans z in [0, 0.04], bone b spans z in [0.04, 0.065], both 0.016 thick
        let mut positions = box_points(Vec3::new(1.0, 0.0, 0.0), Vec3::Z, 0.04, 0.008);
        let a_count = positions.len();
        positions.extend(box_points(Vec3::new(1.0, 0.0, 0.04), Vec3::Z, 0.025, 0.008));
        let weights = (0..positions.len())
            .map(|i| VertexWeights::single(if i < a_count { 0 } else { 1 }))
            .collect();
        SkinnedMesh::new(positions, weights).unwrap()
    }

    #[test]
    fn test_length_to_next_bone() {
        let set = two_bones(Quat::IDENTITY);
        let mesh = finger_mesh();
        let axes = compute_universal_axes(&set, 0);

        let metrics = compute_bone_metrics(&set, &mesh, 0, Some(1), &axes);
        assert!(metrics.has_data());
        assert!((metrics.length - 0.04).abs() < 1e-5);
        assert!((metrics.radius - 0.008).abs() < 1e-5);
    }

    #[test]
    fn test_terminal_length_from_bounds() {
        let convention = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let set = two_bones(convention);
        let mesh = finger_mesh();
        let axes = compute_universal_axes(&set, 1);

        let metrics = compute_bone_metrics(&set, &mesh, 1, None, &axes);
        assert!((metrics.length - 0.025).abs() < 1e-5);
        assert!((metrics.radius - 0.008).abs() < 1e-5);
    }

    #[test]
    fn test_no_influence_is_degenerate() {
        let set = two_bones(Quat::IDENTITY);
        let mesh = SkinnedMesh::new(vec![Vec3::ZERO], vec![VertexWeights::single(7)]).unwrap();
        let axes = compute_universal_axes(&set, 0);

        let metrics = compute_bone_metrics(&set, &mesh, 0, Some(1), &axes);
        assert!(!metrics.has_data());
        assert_eq!(metrics.length, 0.0);
        assert_eq!(metrics.radius, 0.0);
    }

    proptest! {
        #[test]
        fn test_metrics_never_negative(
            points in prop::collection::vec(prop::array::uniform3(-1.0f32..1.0), 1..32),
            convention in prop::array::uniform3(-3.0f32..3.0),
        ) {
            let [x, y, z] = convention;
            let set = two_bones(Quat::from_euler(EulerRot::XYZ, x, y, z));
            let axes = compute_universal_axes(&set, 1);
            let positions: Vec<Vec3> = points.into_iter().map(Vec3::from_array).collect();
            let weights = vec![VertexWeights::single(1); positions.len()];
            let mesh = SkinnedMesh::new(positions, weights).unwrap();

            let metrics = compute_bone_metrics(&set, &mesh, 1, None, &axes);
            prop_assert!(metrics.length >= 0.0 && metrics.length.is_finite());
            prop_assert!(metrics.radius >= 0.0 && metrics.radius.is_finite());
        }
    }
}
