// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Bidirectional nearest-neighbor distances between two point sets
//!
//! This is the dominant cost of the whole pipeline, so each direction runs
//! through a k-d tree instead of brute-force all-pairs distances. Trees are
//! built per comparison and never shared across instances. The immutable
//! tree variant handles point sets where many points share a coordinate
//! value, which is the norm for sampled planar surfaces.

use crate::geometry::PointSet;
use kiddo::{ImmutableKdTree, SquaredEuclidean};

/// Distances (and optional normal alignment) from every point of one set to
/// its nearest neighbor in the other
struct DirectedDistances {
    distances: Vec<f64>,
    /// |cos| between each point's normal and its nearest neighbor's normal;
    /// present only when both sets carry normals
    normal_dots: Option<Vec<f64>>,
}

/// All pairwise metrics derived from one prediction / ground-truth pair
#[derive(Debug, Clone)]
pub struct PairwiseComparison {
    /// Mean distance from prediction to ground truth
    pub accuracy: f64,
    /// Mean distance from ground truth to prediction
    pub completeness: f64,
    /// mean(d_AB) + mean(d_BA)
    pub chamfer_l1: f64,
    /// mean(d_AB^2) + mean(d_BA^2)
    pub chamfer_l2: f64,
    /// Mean absolute cosine of nearest-neighbor normal pairs, averaged over
    /// both directions; `None` when either side has no normals
    pub normal_consistency: Option<f64>,
    /// F-score per threshold, aligned with the `thresholds` argument
    pub f_scores: Vec<f64>,
}

impl PairwiseComparison {
    /// Sentinel produced when either point set is empty: every metric is
    /// NaN, so aggregation can skip the row without crashing the run
    fn not_computable(with_normals: bool, n_thresholds: usize) -> Self {
        Self {
            accuracy: f64::NAN,
            completeness: f64::NAN,
            chamfer_l1: f64::NAN,
            chamfer_l2: f64::NAN,
            normal_consistency: with_normals.then_some(f64::NAN),
            f_scores: vec![f64::NAN; n_thresholds],
        }
    }
}

/// Compare a predicted point set against ground truth.
///
/// `thresholds` is the F-score τ list; precision comes from the
/// prediction→truth direction, recall from truth→prediction.
pub fn compare(pred: &PointSet, gt: &PointSet, thresholds: &[f64]) -> PairwiseComparison {
    let with_normals = pred.has_normals() && gt.has_normals();
    if pred.is_empty() || gt.is_empty() {
        return PairwiseComparison::not_computable(with_normals, thresholds.len());
    }

    let forward = directed(pred, gt);
    let backward = directed(gt, pred);

    let accuracy = mean(&forward.distances);
    let completeness = mean(&backward.distances);
    let accuracy_sq = mean_squared(&forward.distances);
    let completeness_sq = mean_squared(&backward.distances);

    let normal_consistency = match (&forward.normal_dots, &backward.normal_dots) {
        (Some(f), Some(b)) => Some(0.5 * (mean(f) + mean(b))),
        _ => None,
    };

    let f_scores = thresholds
        .iter()
        .map(|&tau| {
            let precision = fraction_within(&forward.distances, tau);
            let recall = fraction_within(&backward.distances, tau);
            if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            }
        })
        .collect();

    PairwiseComparison {
        accuracy,
        completeness,
        chamfer_l1: accuracy + completeness,
        chamfer_l2: accuracy_sq + completeness_sq,
        normal_consistency,
        f_scores,
    }
}

fn directed(from: &PointSet, to: &PointSet) -> DirectedDistances {
    let entries: Vec<[f64; 3]> = to.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&entries);

    let want_normals = from.has_normals() && to.has_normals();
    let mut distances = Vec::with_capacity(from.len());
    let mut dots = want_normals.then(|| Vec::with_capacity(from.len()));

    for (i, p) in from.positions.iter().enumerate() {
        let nearest = tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]);
        distances.push(nearest.distance.sqrt());

        if let Some(dots) = dots.as_mut() {
            let from_normals = from.normals.as_ref().unwrap();
            let to_normals = to.normals.as_ref().unwrap();
            let dot = from_normals[i].dot(&to_normals[nearest.item as usize]).abs();
            // Orientation is ambiguous in either source, only alignment counts
            dots.push(dot.min(1.0));
        }
    }

    DirectedDistances {
        distances,
        normal_dots: dots,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_squared(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64
}

fn fraction_within(distances: &[f64], tau: f64) -> f64 {
    distances.iter().filter(|&&d| d <= tau).count() as f64 / distances.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn grid(offset: f64) -> PointSet {
        let mut positions = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                positions.push(Point3::new(i as f64 * 0.1 + offset, j as f64 * 0.1, 0.0));
            }
        }
        PointSet::new(positions)
    }

    #[test]
    fn test_identical_sets_are_zero() {
        let a = grid(0.0);
        let cmp = compare(&a, &a, &[0.01]);
        assert_eq!(cmp.chamfer_l1, 0.0);
        assert_eq!(cmp.chamfer_l2, 0.0);
        assert_eq!(cmp.f_scores[0], 1.0);
    }

    #[test]
    fn test_chamfer_is_symmetric() {
        let a = grid(0.0);
        let b = grid(0.033);
        let ab = compare(&a, &b, &[]);
        let ba = compare(&b, &a, &[]);
        assert!((ab.chamfer_l1 - ba.chamfer_l1).abs() < 1e-12);
        assert!((ab.chamfer_l2 - ba.chamfer_l2).abs() < 1e-12);
    }

    #[test]
    fn test_f_score_monotone_in_threshold() {
        let a = grid(0.0);
        let b = grid(0.04);
        let cmp = compare(&a, &b, &[0.01, 0.02, 0.05, 0.1]);
        for pair in cmp.f_scores.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_dense_planar_grid() {
        // Hundreds of points sharing one coordinate value (a sampled wall
        // or floor); the index must cope with heavily duplicated axis values
        let mut positions = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                positions.push(Point3::new(i as f64 * 0.05, j as f64 * 0.05, 0.0));
            }
        }
        let plane = PointSet::new(positions.clone());
        let shifted = PointSet::new(
            positions
                .iter()
                .map(|p| Point3::new(p.x, p.y, 0.01))
                .collect(),
        );

        let self_cmp = compare(&plane, &plane, &[0.001]);
        assert_eq!(self_cmp.chamfer_l1, 0.0);
        assert_eq!(self_cmp.f_scores[0], 1.0);

        let cmp = compare(&plane, &shifted, &[0.001]);
        assert!((cmp.accuracy - 0.01).abs() < 1e-12);
        assert!((cmp.completeness - 0.01).abs() < 1e-12);
        assert_eq!(cmp.f_scores[0], 0.0);
    }

    #[test]
    fn test_known_shift() {
        // Two single points at distance 0.5
        let a = PointSet::new(vec![Point3::new(0.0, 0.0, 0.0)]);
        let b = PointSet::new(vec![Point3::new(0.5, 0.0, 0.0)]);
        let cmp = compare(&a, &b, &[0.4, 0.6]);
        assert!((cmp.chamfer_l1 - 1.0).abs() < 1e-12);
        assert!((cmp.chamfer_l2 - 0.5).abs() < 1e-12);
        assert_eq!(cmp.f_scores, vec![0.0, 1.0]);
    }

    #[test]
    fn test_normal_consistency_absolute() {
        let up = Vector3::new(0.0, 0.0, 1.0);
        let down = Vector3::new(0.0, 0.0, -1.0);
        let a = PointSet::with_normals(vec![Point3::origin()], vec![up]);
        let b = PointSet::with_normals(vec![Point3::origin()], vec![down]);
        let cmp = compare(&a, &b, &[]);
        // Anti-parallel normals still count as aligned
        assert_eq!(cmp.normal_consistency, Some(1.0));
    }

    #[test]
    fn test_empty_set_yields_nan() {
        let a = PointSet::new(Vec::new());
        let b = grid(0.0);
        let cmp = compare(&a, &b, &[0.01]);
        assert!(cmp.chamfer_l1.is_nan());
        assert!(cmp.accuracy.is_nan());
        assert!(cmp.f_scores[0].is_nan());
    }

    #[test]
    fn test_normals_skipped_when_one_side_lacks_them() {
        let a = PointSet::with_normals(
            vec![Point3::origin()],
            vec![Vector3::new(0.0, 0.0, 1.0)],
        );
        let b = PointSet::new(vec![Point3::origin()]);
        let cmp = compare(&a, &b, &[]);
        assert!(cmp.normal_consistency.is_none());
    }
}
