//! Skinned mesh data
//!
//! Only what rig solving needs: bind-pose vertex positions (in the same space
//! as the skeleton's rest world transforms) and up to four bone influences per
//! vertex.

mod metrics;

pub use metrics::{compute_bone_metrics, BoneMetrics};

use glam::Vec3;

use crate::{Result, RigError};

/// Up to four bone influences of a vertex
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VertexWeights {
    pub bones: [u32; 4],
    pub weights: [f32; 4],
}

impl VertexWeights {
    pub fn new(bones: [u32; 4], weights: [f32; 4]) -> Self {
        Self { bones, weights }
    }

    /// Fully bound to a single bone
    pub fn single(bone: u32) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Bone with the largest weight. Ties keep the first slot; no positive weight means none.
    pub fn dominant_bone(&self) -> Option<u32> {
        let mut best: Option<(u32, f32)> = None;
        for (&bone, &weight) in self.bones.iter().zip(&self.weights) {
            if weight <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_weight)) if best_weight >= weight => {}
                _ => best = Some((bone, weight)),
            }
        }
        best.map(|(bone, _)| bone)
    }
}

/// Mesh with per-vertex skin influences
#[derive(Clone, Debug)]
pub struct SkinnedMesh {
    positions: Vec<Vec3>,
    weights: Vec<VertexWeights>,
    /// Cached dominant bone per vertex
    dominant: Vec<Option<u32>>,
}

impl SkinnedMesh {
    /// Fails if positions and weights differ in length
    pub fn new(positions: Vec<Vec3>, weights: Vec<VertexWeights>) -> Result<Self> {
        if positions.len() != weights.len() {
            return Err(RigError::MismatchedLength {
                what: "vertex weights",
                expected: positions.len(),
                actual: weights.len(),
            });
        }
        let dominant = classify_vertices(&weights);
        Ok(Self {
            positions,
            weights,
            dominant,
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn weights(&self) -> &[VertexWeights] {
        &self.weights
    }

    /// Positions of the vertices whose dominant influence is `bone`
    pub fn vertices_influenced_by(&self, bone: usize) -> impl Iterator<Item = Vec3> + '_ {
        self.positions
            .iter()
            .zip(&self.dominant)
            .filter(move |(_, dominant)| dominant.map(|b| b as usize) == Some(bone))
            .map(|(position, _)| *position)
    }
}

#[cfg(not(feature = "parallel"))]
fn classify_vertices(weights: &[VertexWeights]) -> Vec<Option<u32>> {
    weights.iter().map(VertexWeights::dominant_bone).collect()
}

#[cfg(feature = "parallel")]
fn classify_vertices(weights: &[VertexWeights]) -> Vec<Option<u32>> {
    use rayon::prelude::*;
    weights.par_iter().map(VertexWeights::dominant_bone).collect()
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// None for an empty point set
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for point in points {
            aabb.min = aabb.min.min(point);
            aabb.max = aabb.max.max(point);
        }
        Some(aabb)
    }

    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Length of the box's shadow on a unit axis
    #[inline]
    pub fn projected_extent(&self, axis: Vec3) -> f32 {
        let e = self.extent();
        (e.x * axis.x).abs() + (e.y * axis.y).abs() + (e.z * axis.z).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_bone() {
        let w = VertexWeights::new([3, 7, 9, 0], [0.2, 0.5, 0.3, 0.0]);
        assert_eq!(w.dominant_bone(), Some(7));

        let tie = VertexWeights::new([4, 5, 0, 0], [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(tie.dominant_bone(), Some(4));

        assert_eq!(VertexWeights::default().dominant_bone(), None);
    }

    #[test]
    fn test_mismatched_lengths() {
        let result = SkinnedMesh::new(vec![Vec3::ZERO; 3], vec![VertexWeights::single(0); 2]);
        assert!(matches!(result, Err(RigError::MismatchedLength { .. })));
    }

    #[test]
    fn test_influence_filter() {
        let mesh = SkinnedMesh::new(
            vec![Vec3::X, Vec3::Y, Vec3::Z],
            vec![
                VertexWeights::single(1),
                VertexWeights::single(2),
                VertexWeights::new([2, 1, 0, 0], [0.1, 0.9, 0.0, 0.0]),
            ],
        )
        .unwrap();

        let of_one: Vec<Vec3> = mesh.vertices_influenced_by(1).collect();
        assert_eq!(of_one, vec![Vec3::X, Vec3::Z]);
        assert_eq!(mesh.vertices_influenced_by(5).count(), 0);
    }

    #[test]
    fn test_aabb() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());

        let points = [Vec3::new(-1.0, 2.0, 0.0), Vec3::new(1.0, 0.0, 0.5)];
        let aabb = Aabb::from_points(points).unwrap();
        assert_eq!(aabb.extent(), Vec3::new(2.0, 2.0, 0.5));
        assert!((aabb.projected_extent(Vec3::Z) - 0.5).abs() < 1e-6);
        assert!(aabb.corners().contains(&Vec3::new(1.0, 2.0, 0.5)));
    }
}
