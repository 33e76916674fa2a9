// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Reconstruction benchmark: metrics, dataset indexing, evaluation loop and
//! report generation

pub mod dataset;
pub mod distance;
pub mod evaluator;
pub mod reporter;
pub mod runner;

pub use dataset::{Dataset, GroundTruth, ModelInfo};
pub use distance::{compare, PairwiseComparison};
pub use evaluator::{f_score_name, MeshEvaluator, MetricSet, WallFilter, WALL_EPS};
pub use reporter::{ClassSummary, MetricRow, ReportTable};
pub use runner::{EvalRunner, RunOptions, RunStats};

use crate::config::EvalConfig;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// File names written into the generation directory
pub const FULL_REPORT_FILE: &str = "eval_meshes_full.csv";
pub const CLASS_REPORT_FILE: &str = "eval_meshes.csv";
pub const JSON_REPORT_FILE: &str = "eval_meshes.json";

/// Run the full benchmark described by `cfg` and write the three report
/// files into the generation directory.
pub fn evaluate(cfg: &EvalConfig, parallel: bool) -> Result<(ReportTable, RunStats)> {
    let generation_dir = PathBuf::from(&cfg.generation.generation_dir);
    if !generation_dir.is_dir() {
        bail!(
            "generation directory not found: {}",
            generation_dir.display()
        );
    }

    let dataset = Dataset::open(&cfg.data)?;
    if dataset.is_empty() {
        bail!("dataset split is empty, nothing to evaluate");
    }

    let runner = EvalRunner::new(
        dataset,
        MeshEvaluator::from_config(&cfg.eval),
        RunOptions {
            generation_dir: generation_dir.clone(),
            mesh_suffix: cfg.generation.mesh_suffix.clone(),
            eval_mesh: cfg.test.eval_mesh,
            eval_pointcloud: cfg.test.eval_pointcloud,
            remove_wall: cfg.test.remove_wall,
            parallel,
            seed: cfg.eval.seed,
        },
    );

    let (rows, stats) = runner.run();
    let table = ReportTable::from_rows(rows);

    table
        .write_full_csv(&generation_dir.join(FULL_REPORT_FILE))
        .context("failed to write the per-instance report")?;
    table
        .write_class_csv(&generation_dir.join(CLASS_REPORT_FILE))
        .context("failed to write the per-class report")?;
    table
        .write_json(&generation_dir.join(JSON_REPORT_FILE))
        .context("failed to write the JSON report")?;

    Ok((table, stats))
}
