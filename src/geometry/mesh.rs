// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Triangle mesh representation

use super::BoundingBox;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Triangular mesh loaded from a generated reconstruction.
///
/// A mesh may be degenerate (zero faces, or only zero-area faces); this is a
/// recoverable condition that yields sentinel metrics, not an error at load
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    pub fn from_parts(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Corner positions of face `i`
    pub fn face_points(&self, i: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[i];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Area of face `i`
    pub fn face_area(&self, i: usize) -> f64 {
        let [p0, p1, p2] = self.face_points(i);
        (p1 - p0).cross(&(p2 - p0)).norm() * 0.5
    }

    /// Outward unit normal of face `i`, or zero for a degenerate face
    pub fn face_normal(&self, i: usize) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_points(i);
        let normal = (p1 - p0).cross(&(p2 - p0));
        let len = normal.norm();
        if len > 0.0 {
            normal / len
        } else {
            Vector3::zeros()
        }
    }

    /// Whether the mesh has at least one face with nonzero area
    pub fn has_surface_area(&self) -> bool {
        (0..self.faces.len()).any(|i| self.face_area(i) > 0.0)
    }

    /// Drop faces referencing out-of-range vertices or repeating an index.
    /// Importers call this so malformed files degrade instead of panicking.
    pub fn retain_valid_faces(&mut self) {
        let n = self.vertices.len();
        self.faces.retain(|&[a, b, c]| {
            a < n && b < n && c < n && a != b && b != c && a != c
        });
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
