// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Per-instance metric aggregation

use super::distance::{self, PairwiseComparison};
use crate::config::MetricConfig;
use crate::geometry::{occupancy_mask, sample_surface, volumetric_iou, BoundingBox, Mesh, PointSet};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::Rng;

/// Margin added around the ground-truth bounding box by the wall filter
pub const WALL_EPS: f64 = 0.007;

/// Ordered metric-name → value mapping for one instance and one modality.
///
/// Insertion order is preserved so report columns come out in a stable
/// order; NaN marks a metric that could not be computed.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    entries: Vec<(String, f64)>,
}

impl MetricSet {
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Discards predicted samples lying on the synthetic bounding walls that
/// some indoor-scene datasets add around each room.
///
/// Convention: keep samples inside the ground-truth x/z extent (inflated by
/// [`WALL_EPS`]) and above the floor; there is no ceiling bound.
pub struct WallFilter {
    bounds: BoundingBox,
}

impl WallFilter {
    pub fn from_ground_truth(gt: &PointSet) -> Self {
        Self {
            bounds: BoundingBox::from_points(&gt.positions).inflated(WALL_EPS),
        }
    }

    pub fn mask(&self, points: &[Point3<f64>]) -> Vec<bool> {
        points
            .iter()
            .map(|p| {
                p.x >= self.bounds.min.x
                    && p.x <= self.bounds.max.x
                    && p.z >= self.bounds.min.z
                    && p.z <= self.bounds.max.z
                    && p.y >= self.bounds.min.y
            })
            .collect()
    }
}

/// Computes the full metric schema for one instance
#[derive(Debug, Clone)]
pub struct MeshEvaluator {
    /// Number of surface samples drawn from a candidate mesh
    pub n_points: usize,
    /// F-score thresholds, ascending
    pub thresholds: Vec<f64>,
}

impl Default for MeshEvaluator {
    fn default() -> Self {
        Self {
            n_points: 100_000,
            thresholds: vec![0.01, 0.015, 0.02],
        }
    }
}

impl MeshEvaluator {
    pub fn new(n_points: usize) -> Self {
        Self {
            n_points,
            ..Self::default()
        }
    }

    pub fn from_config(cfg: &MetricConfig) -> Self {
        Self {
            n_points: cfg.n_points,
            thresholds: cfg.f_thresholds.clone(),
        }
    }

    /// Evaluate a candidate mesh against ground truth.
    ///
    /// A missing-from-disk mesh never reaches this function; a degenerate
    /// one (no faces, or only zero-area faces) yields a sentinel row of NaN
    /// values instead of an error, so one bad instance cannot abort a run.
    pub fn eval_mesh(
        &self,
        mesh: &Mesh,
        gt: &PointSet,
        occ_points: &[Point3<f64>],
        occ_labels: &[bool],
        remove_wall: bool,
        rng: &mut StdRng,
    ) -> MetricSet {
        let with_normals = gt.has_normals();

        let samples = match self.sample_candidate(mesh, gt, remove_wall, rng) {
            Some(samples) => samples,
            None => return self.sentinel(with_normals, true),
        };

        let cmp = distance::compare(&samples, gt, &self.thresholds);
        let mut out = MetricSet::default();
        self.insert_distance_metrics(&mut out, &cmp);

        // Topology that cannot be oriented leaves only the IoU unusable
        let iou = match occupancy_mask(mesh, occ_points) {
            Ok(mask) => volumetric_iou(&mask, occ_labels),
            Err(_) => f64::NAN,
        };
        out.insert("iou", iou);

        out
    }

    /// Evaluate a candidate point cloud against ground truth.
    ///
    /// Normal consistency is reported only when both clouds carry normals;
    /// occupancy is never available in this mode.
    pub fn eval_pointcloud(&self, pred: &PointSet, gt: &PointSet) -> MetricSet {
        if pred.is_empty() || gt.is_empty() {
            return self.sentinel(pred.has_normals() && gt.has_normals(), false);
        }

        let cmp = distance::compare(pred, gt, &self.thresholds);
        let mut out = MetricSet::default();
        self.insert_distance_metrics(&mut out, &cmp);
        out
    }

    fn sample_candidate(
        &self,
        mesh: &Mesh,
        gt: &PointSet,
        remove_wall: bool,
        rng: &mut StdRng,
    ) -> Option<PointSet> {
        if !remove_wall {
            return sample_surface(mesh, self.n_points, rng).ok();
        }

        // Oversample, drop wall points, then resample to the target count
        // with replacement
        let samples = sample_surface(mesh, 2 * self.n_points, rng).ok()?;
        let filter = WallFilter::from_ground_truth(gt);
        let kept = samples.filtered(&filter.mask(&samples.positions));
        if kept.is_empty() {
            return None;
        }

        let indices: Vec<usize> = (0..self.n_points)
            .map(|_| rng.gen_range(0..kept.len()))
            .collect();
        Some(kept.gather(&indices))
    }

    fn insert_distance_metrics(&self, out: &mut MetricSet, cmp: &PairwiseComparison) {
        out.insert("completeness", cmp.completeness);
        out.insert("accuracy", cmp.accuracy);
        if let Some(normals) = cmp.normal_consistency {
            out.insert("normals", normals);
        }
        out.insert("chamfer-L2", cmp.chamfer_l2);
        out.insert("chamfer-L1", cmp.chamfer_l1);
        for (tau, f) in self.thresholds.iter().zip(&cmp.f_scores) {
            out.insert(f_score_name(*tau), *f);
        }
    }

    /// Full schema filled with NaN, for missing/degenerate candidates
    fn sentinel(&self, with_normals: bool, mesh_mode: bool) -> MetricSet {
        let mut out = MetricSet::default();
        out.insert("completeness", f64::NAN);
        out.insert("accuracy", f64::NAN);
        if with_normals {
            out.insert("normals", f64::NAN);
        }
        out.insert("chamfer-L2", f64::NAN);
        out.insert("chamfer-L1", f64::NAN);
        for tau in &self.thresholds {
            out.insert(f_score_name(*tau), f64::NAN);
        }
        if mesh_mode {
            out.insert("iou", f64::NAN);
        }
        out
    }
}

/// Metric name for an F-score threshold, in per-mille of the unit scale
/// (τ = 0.01 becomes `f-score-10`)
pub fn f_score_name(tau: f64) -> String {
    format!("f-score-{:.0}", tau * 1000.0)
}
