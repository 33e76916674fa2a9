// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Dataset indexing and ground-truth loading
//!
//! Layout: `<root>/<category>/<model>/` with per-model NPZ ground truth.
//! The model list per category comes from a `<split>.lst` file when one
//! exists, otherwise from the sorted directory entries. A `metadata.toml`
//! at the root may map category ids to display names; datasets without one
//! still evaluate, with `n/a` class names.

use crate::config::DataConfig;
use crate::error::MetricError;
use crate::geometry::PointSet;
use crate::io::NpzArchive;
use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Display metadata for one category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryMeta {
    pub name: String,
}

/// Identity of one instance
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub idx: usize,
    pub category_id: String,
    pub category_name: String,
    pub model_name: String,
}

/// Ground truth for one instance
#[derive(Debug, Clone)]
pub struct GroundTruth {
    /// Surface samples with outward unit normals
    pub pointcloud: PointSet,
    /// Occupancy query points
    pub occ_points: Vec<Point3<f64>>,
    /// Binary occupancy labels, aligned with `occ_points`
    pub occ_labels: Vec<bool>,
}

#[derive(Debug, Clone)]
struct Entry {
    /// `None` for models sitting directly at the dataset root
    category: Option<String>,
    model: String,
}

/// Index over all instances of the evaluation split
pub struct Dataset {
    root: PathBuf,
    entries: Vec<Entry>,
    metadata: Option<HashMap<String, CategoryMeta>>,
    pointcloud_file: String,
    points_file: String,
    unpackbits: bool,
}

impl Dataset {
    /// Index the dataset. Unreadable roots are fatal; everything that can
    /// go wrong for a single instance is deferred to [`Self::ground_truth`].
    pub fn open(cfg: &DataConfig) -> Result<Self> {
        let root = PathBuf::from(&cfg.dataset_folder);
        if !root.is_dir() {
            bail!("dataset folder not found: {}", root.display());
        }

        let metadata = read_metadata(&root.join("metadata.toml"))?;

        let categories: Vec<String> = match &cfg.classes {
            Some(classes) if !classes.is_empty() => classes.clone(),
            _ => sorted_subdirs(&root)
                .context(format!("failed to list dataset folder {}", root.display()))?,
        };

        let mut entries = Vec::new();
        for category in categories {
            let category_dir = root.join(&category);
            if !category_dir.is_dir() {
                bail!("category folder not found: {}", category_dir.display());
            }

            // A directory that itself holds ground-truth files is a bare
            // model at the root, not a category
            if category_dir.join(&cfg.pointcloud_file).exists() {
                entries.push(Entry {
                    category: None,
                    model: category,
                });
                continue;
            }

            let split_file = category_dir.join(format!("{}.lst", cfg.test_split));
            let models = if split_file.exists() {
                read_split(&split_file)?
            } else {
                sorted_subdirs(&category_dir)
                    .context(format!("failed to list {}", category_dir.display()))?
            };

            for model in models {
                entries.push(Entry {
                    category: Some(category.clone()),
                    model,
                });
            }
        }

        Ok(Self {
            root,
            entries,
            metadata,
            pointcloud_file: cfg.pointcloud_file.clone(),
            points_file: cfg.points_file.clone(),
            unpackbits: cfg.points_unpackbits,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_model_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Identity of instance `idx`. Always succeeds: datasets without
    /// metadata get `n/a` category names, and a stored `n/a` name falls
    /// back to the raw category id (scene datasets where the id itself is
    /// the meaningful label).
    pub fn model_info(&self, idx: usize) -> ModelInfo {
        let entry = &self.entries[idx];
        let category_id = entry.category.clone().unwrap_or_else(|| "n/a".to_string());
        ModelInfo {
            idx,
            category_name: self.category_name(&category_id),
            category_id,
            model_name: entry.model.clone(),
        }
    }

    fn category_name(&self, category_id: &str) -> String {
        match &self.metadata {
            None => "n/a".to_string(),
            Some(metadata) => match metadata.get(category_id) {
                Some(meta) if meta.name != "n/a" => meta.name.clone(),
                Some(_) => category_id.to_string(),
                None => "n/a".to_string(),
            },
        }
    }

    /// Load the ground truth of instance `idx`
    pub fn ground_truth(&self, idx: usize) -> Result<GroundTruth, MetricError> {
        let dir = self.model_dir(&self.entries[idx]);

        let pointcloud_path = dir.join(&self.pointcloud_file);
        let mut pointcloud_npz = NpzArchive::open(&pointcloud_path)?;
        let positions = pointcloud_npz.points("points")?;
        let mut normals = pointcloud_npz.vectors("normals")?;
        if normals.len() != positions.len() {
            return Err(MetricError::parse(
                &pointcloud_path,
                "normals not aligned with points",
            ));
        }
        for normal in &mut normals {
            let len = normal.norm();
            if len > 0.0 {
                *normal /= len;
            }
        }

        let points_path = dir.join(&self.points_file);
        let mut points_npz = NpzArchive::open(&points_path)?;
        let occ_points = points_npz.points("points")?;
        let occ_labels = points_npz.booleans("occupancies", occ_points.len(), self.unpackbits)?;

        Ok(GroundTruth {
            pointcloud: PointSet::with_normals(positions, normals),
            occ_points,
            occ_labels,
        })
    }

    fn model_dir(&self, entry: &Entry) -> PathBuf {
        match &entry.category {
            Some(category) => self.root.join(category).join(&entry.model),
            None => self.root.join(&entry.model),
        }
    }
}

fn read_metadata(path: &Path) -> Result<Option<HashMap<String, CategoryMeta>>> {
    if !path.exists() {
        return Ok(None);
    }
    let source = std::fs::read_to_string(path)
        .context(format!("failed to read {}", path.display()))?;
    let metadata =
        toml::from_str(&source).context(format!("failed to parse {}", path.display()))?;
    Ok(Some(metadata))
}

fn read_split(path: &Path) -> Result<Vec<String>> {
    let source = std::fs::read_to_string(path)
        .context(format!("failed to read split file {}", path.display()))?;
    Ok(source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn sorted_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    Ok(names)
}
