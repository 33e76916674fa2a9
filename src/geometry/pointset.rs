// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Point sets with optional per-point normals

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Ordered sequence of 3D points, optionally carrying unit normals.
///
/// Invariant: when normals are present they are index-aligned with the
/// positions and unit-length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSet {
    pub positions: Vec<Point3<f64>>,
    pub normals: Option<Vec<Vector3<f64>>>,
}

impl PointSet {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            normals: None,
        }
    }

    pub fn with_normals(positions: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>) -> Self {
        debug_assert_eq!(positions.len(), normals.len());
        Self {
            positions,
            normals: Some(normals),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Keep only the points selected by `mask` (same length as positions)
    pub fn filtered(&self, mask: &[bool]) -> Self {
        let positions = self
            .positions
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(p, _)| *p)
            .collect();

        let normals = self.normals.as_ref().map(|normals| {
            normals
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(n, _)| *n)
                .collect()
        });

        Self { positions, normals }
    }

    /// Select points by index, with repetition allowed
    pub fn gather(&self, indices: &[usize]) -> Self {
        let positions = indices.iter().map(|&i| self.positions[i]).collect();
        let normals = self
            .normals
            .as_ref()
            .map(|normals| indices.iter().map(|&i| normals[i]).collect());
        Self { positions, normals }
    }
}
