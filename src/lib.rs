// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Meshbench
//!
//! A benchmark harness for 3D reconstruction methods. Compares generated
//! meshes and point clouds against sampled ground truth and reports Chamfer
//! distances, normal consistency, F-scores and volumetric IoU, aggregated
//! per class.

pub mod config;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod io;

pub use config::{load_config, EvalConfig};
pub use error::MetricError;
pub use eval::{evaluate, MeshEvaluator, MetricSet, ReportTable};
pub use geometry::{Mesh, PointSet};
pub use io::{load_mesh, load_pointcloud};
