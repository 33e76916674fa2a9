// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Evaluation configuration (TOML file + CLI overrides)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub data: DataConfig,
    pub test: TestConfig,
    pub eval: MetricConfig,
    pub generation: GenerationConfig,
}

/// Dataset location and ground-truth field names
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root directory of the evaluation dataset
    pub dataset_folder: String,
    /// Categories to evaluate; all discovered categories when empty
    pub classes: Option<Vec<String>>,
    /// Split list file name (without extension) inside each category
    pub test_split: String,
    /// Per-model NPZ with the chamfer ground truth (`points`, `normals`)
    pub pointcloud_file: String,
    /// Per-model NPZ with occupancy queries (`points`, `occupancies`)
    pub points_file: String,
    /// Whether `occupancies` is stored bit-packed (numpy `packbits`)
    pub points_unpackbits: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_folder: String::new(),
            classes: None,
            test_split: "test".to_string(),
            pointcloud_file: "pointcloud.npz".to_string(),
            points_file: "points.npz".to_string(),
            points_unpackbits: true,
        }
    }
}

/// Which modalities to evaluate
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub eval_mesh: bool,
    pub eval_pointcloud: bool,
    /// Discard predicted samples on synthetic bounding walls (indoor scenes)
    pub remove_wall: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            eval_mesh: true,
            eval_pointcloud: false,
            remove_wall: false,
        }
    }
}

/// Metric engine parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Number of surface samples drawn from each candidate mesh
    pub n_points: usize,
    /// F-score distance thresholds, in ground-truth units
    pub f_thresholds: Vec<f64>,
    /// RNG seed for surface sampling; omitted means non-reproducible
    pub seed: Option<u64>,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            n_points: 100_000,
            f_thresholds: vec![0.01, 0.015, 0.02],
            seed: None,
        }
    }
}

/// Location and naming of the generated reconstructions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Directory holding the generated meshes / point clouds
    pub generation_dir: String,
    /// File extension of generated meshes
    pub mesh_suffix: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generation_dir: String::new(),
            mesh_suffix: "obj".to_string(),
        }
    }
}

/// Load a config file, falling back to defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<EvalConfig> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .context(format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&source)
                .context(format!("Failed to parse config file: {}", path.display()))
        }
        None => Ok(EvalConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = EvalConfig::default();
        assert_eq!(cfg.eval.n_points, 100_000);
        assert_eq!(cfg.eval.f_thresholds, vec![0.01, 0.015, 0.02]);
        assert!(cfg.test.eval_mesh);
        assert!(!cfg.test.eval_pointcloud);
        assert_eq!(cfg.generation.mesh_suffix, "obj");
    }

    #[test]
    fn test_partial_config() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "[test]\neval_pointcloud = true\n\n[eval]\nn_points = 5000\nseed = 7\n"
        )?;

        let cfg = load_config(Some(file.path()))?;
        assert!(cfg.test.eval_pointcloud);
        assert_eq!(cfg.eval.n_points, 5000);
        assert_eq!(cfg.eval.seed, Some(7));
        // Untouched sections keep defaults
        assert_eq!(cfg.data.test_split, "test");
        Ok(())
    }
}
