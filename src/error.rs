// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Per-instance error taxonomy
//!
//! Dataset- and config-level failures are reported through `anyhow` at the
//! process boundary; everything that can go wrong for a single instance is a
//! [`MetricError`] so the evaluation loop can match on the kind and decide
//! between skipping the instance and emitting sentinel metrics.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while evaluating a single instance
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    #[error("mesh has no face with nonzero area")]
    DegenerateMesh,

    #[error("point set is empty")]
    EmptyPointSet,

    #[error("occupancy test failed: {0}")]
    Occupancy(String),
}

impl MetricError {
    /// Convenience constructor for I/O failures tied to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for parse failures tied to a path
    pub fn parse(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            details: details.into(),
        }
    }
}
