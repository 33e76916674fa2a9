// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Evaluation loop over a generation directory
//!
//! One instance failing never aborts the run: missing candidates produce a
//! row without that modality's metrics, unreadable ground truth skips the
//! instance with a warning.

use super::dataset::{Dataset, GroundTruth, ModelInfo};
use super::evaluator::MeshEvaluator;
use super::reporter::MetricRow;
use crate::error::MetricError;
use crate::io::{load_mesh, load_pointcloud};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::PathBuf;

/// What to evaluate and where the candidates live
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub generation_dir: PathBuf,
    /// Candidate mesh extension, e.g. `obj` or `off`
    pub mesh_suffix: String,
    pub eval_mesh: bool,
    pub eval_pointcloud: bool,
    pub remove_wall: bool,
    pub parallel: bool,
    /// Base seed for surface sampling; `None` draws from entropy
    pub seed: Option<u64>,
}

/// Counters reported after a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub evaluated: usize,
    pub skipped: usize,
    /// Candidates absent from disk
    pub missing_meshes: usize,
    pub missing_pointclouds: usize,
    /// Candidates present but unreadable or unevaluable
    pub invalid_meshes: usize,
    pub invalid_pointclouds: usize,
}

/// How one candidate file fared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateStatus {
    Evaluated,
    Missing,
    Invalid,
}

struct InstanceOutcome {
    row: Option<MetricRow>,
    mesh: Option<CandidateStatus>,
    pointcloud: Option<CandidateStatus>,
}

/// Drives the evaluator over every instance of the dataset split
pub struct EvalRunner {
    dataset: Dataset,
    evaluator: MeshEvaluator,
    options: RunOptions,
}

impl EvalRunner {
    pub fn new(dataset: Dataset, evaluator: MeshEvaluator, options: RunOptions) -> Self {
        Self {
            dataset,
            evaluator,
            options,
        }
    }

    /// Evaluate every instance. Rows keep their dataset index so callers
    /// can restore order after a parallel run.
    pub fn run(&self) -> (Vec<MetricRow>, RunStats) {
        let progress = ProgressBar::new(self.dataset.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
        );

        let outcomes: Vec<InstanceOutcome> = if self.options.parallel {
            (0..self.dataset.len())
                .into_par_iter()
                .map(|idx| {
                    let outcome = self.eval_instance(idx, &progress);
                    progress.inc(1);
                    outcome
                })
                .collect()
        } else {
            (0..self.dataset.len())
                .map(|idx| {
                    let outcome = self.eval_instance(idx, &progress);
                    progress.inc(1);
                    outcome
                })
                .collect()
        };

        progress.finish_and_clear();

        let mut rows = Vec::with_capacity(outcomes.len());
        let mut stats = RunStats::default();
        for outcome in outcomes {
            match outcome.row {
                Some(row) => {
                    rows.push(row);
                    stats.evaluated += 1;
                }
                None => stats.skipped += 1,
            }
            match outcome.mesh {
                Some(CandidateStatus::Missing) => stats.missing_meshes += 1,
                Some(CandidateStatus::Invalid) => stats.invalid_meshes += 1,
                _ => {}
            }
            match outcome.pointcloud {
                Some(CandidateStatus::Missing) => stats.missing_pointclouds += 1,
                Some(CandidateStatus::Invalid) => stats.invalid_pointclouds += 1,
                _ => {}
            }
        }

        (rows, stats)
    }

    fn eval_instance(&self, idx: usize, progress: &ProgressBar) -> InstanceOutcome {
        let info = self.dataset.model_info(idx);

        let gt = match self.dataset.ground_truth(idx) {
            Ok(gt) => gt,
            Err(err) => {
                progress.println(format!(
                    "{} skipping {}/{}: {err}",
                    "Warning:".yellow(),
                    info.category_id,
                    info.model_name
                ));
                return InstanceOutcome {
                    row: None,
                    mesh: None,
                    pointcloud: None,
                };
            }
        };

        let mut row = MetricRow::new(&info);

        let mesh = self
            .options
            .eval_mesh
            .then(|| self.eval_mesh_candidate(&info, &gt, &mut row, progress));
        let pointcloud = self
            .options
            .eval_pointcloud
            .then(|| self.eval_pointcloud_candidate(&info, &gt, &mut row, progress));

        InstanceOutcome {
            row: Some(row),
            mesh,
            pointcloud,
        }
    }

    /// A missing or unevaluable candidate leaves the row without mesh
    /// columns; the two cases are counted separately
    fn eval_mesh_candidate(
        &self,
        info: &ModelInfo,
        gt: &GroundTruth,
        row: &mut MetricRow,
        progress: &ProgressBar,
    ) -> CandidateStatus {
        let path = self.mesh_path(info);
        match load_mesh(&path) {
            Ok(mesh) => {
                let mut rng = self.instance_rng(info.idx);
                let set = self.evaluator.eval_mesh(
                    &mesh,
                    &gt.pointcloud,
                    &gt.occ_points,
                    &gt.occ_labels,
                    self.options.remove_wall,
                    &mut rng,
                );
                row.extend("mesh", &set);
                CandidateStatus::Evaluated
            }
            Err(MetricError::MissingFile(path)) => {
                progress.println(format!(
                    "{} mesh does not exist: {}",
                    "Warning:".yellow(),
                    path.display()
                ));
                CandidateStatus::Missing
            }
            Err(err) => {
                progress.println(format!(
                    "{} could not evaluate mesh {}: {err}",
                    "Error:".red(),
                    path.display()
                ));
                CandidateStatus::Invalid
            }
        }
    }

    fn eval_pointcloud_candidate(
        &self,
        info: &ModelInfo,
        gt: &GroundTruth,
        row: &mut MetricRow,
        progress: &ProgressBar,
    ) -> CandidateStatus {
        let path = self.pointcloud_path(info);
        match load_pointcloud(&path) {
            Ok(cloud) => {
                let set = self.evaluator.eval_pointcloud(&cloud, &gt.pointcloud);
                row.extend("pcl", &set);
                CandidateStatus::Evaluated
            }
            Err(MetricError::MissingFile(path)) => {
                progress.println(format!(
                    "{} pointcloud does not exist: {}",
                    "Warning:".yellow(),
                    path.display()
                ));
                CandidateStatus::Missing
            }
            Err(err) => {
                progress.println(format!(
                    "{} could not evaluate pointcloud {}: {err}",
                    "Error:".red(),
                    path.display()
                ));
                CandidateStatus::Invalid
            }
        }
    }

    /// `<generation_dir>/[<category>/]<model>.<suffix>`
    fn mesh_path(&self, info: &ModelInfo) -> PathBuf {
        let mut dir = self.options.generation_dir.clone();
        if info.category_id != "n/a" {
            dir = dir.join(&info.category_id);
        }
        dir.join(format!("{}.{}", info.model_name, self.options.mesh_suffix))
    }

    /// `<generation_dir>/pointcloud/[<category>/]<model>.ply`
    fn pointcloud_path(&self, info: &ModelInfo) -> PathBuf {
        let mut dir = self.options.generation_dir.join("pointcloud");
        if info.category_id != "n/a" {
            dir = dir.join(&info.category_id);
        }
        dir.join(format!("{}.ply", info.model_name))
    }

    /// Sampling stays reproducible per instance even when the loop runs in
    /// parallel: the base seed is mixed with the instance index
    fn instance_rng(&self, idx: usize) -> StdRng {
        match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(
                seed ^ (idx as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
            ),
            None => StdRng::from_entropy(),
        }
    }
}
