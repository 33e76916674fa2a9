// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Occupancy queries using parry3d

use super::Mesh;
use crate::error::MetricError;
use parry3d_f64::query::PointQuery;
use parry3d_f64::shape::{TriMesh, TriMeshFlags};

/// Evaluate the mesh's predicted occupancy (inside/outside) at the given
/// query points.
///
/// The containment test needs oriented pseudo-normals, which requires a
/// closed, consistently wound surface; meshes that cannot be oriented yield
/// a [`MetricError::Occupancy`].
pub fn occupancy_mask(
    mesh: &Mesh,
    points: &[nalgebra::Point3<f64>],
) -> Result<Vec<bool>, MetricError> {
    if mesh.faces.is_empty() {
        return Err(MetricError::DegenerateMesh);
    }

    let vertices = mesh.vertices.clone();
    let indices: Vec<[u32; 3]> = mesh
        .faces
        .iter()
        .map(|&[a, b, c]| [a as u32, b as u32, c as u32])
        .collect();

    let mut trimesh = TriMesh::new(vertices, indices);
    trimesh
        .set_flags(
            TriMeshFlags::MERGE_DUPLICATE_VERTICES
                | TriMeshFlags::DELETE_DEGENERATE_TRIANGLES
                | TriMeshFlags::ORIENTED,
        )
        .map_err(|e| MetricError::Occupancy(format!("{e:?}")))?;

    Ok(points
        .iter()
        .map(|p| trimesh.contains_local_point(p))
        .collect())
}

/// Intersection-over-union of two occupancy masks.
///
/// An empty union counts as perfect agreement on emptiness and scores 1.0.
pub fn volumetric_iou(pred: &[bool], gt: &[bool]) -> f64 {
    debug_assert_eq!(pred.len(), gt.len());

    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&p, &g) in pred.iter().zip(gt) {
        if p && g {
            intersection += 1;
        }
        if p || g {
            union += 1;
        }
    }

    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn unit_cube() -> Mesh {
        let (lo, hi) = (-0.5, 0.5);
        let vertices = vec![
            Point3::new(lo, lo, lo),
            Point3::new(hi, lo, lo),
            Point3::new(hi, hi, lo),
            Point3::new(lo, hi, lo),
            Point3::new(lo, lo, hi),
            Point3::new(hi, lo, hi),
            Point3::new(hi, hi, hi),
            Point3::new(lo, hi, hi),
        ];
        let faces = vec![
            [4, 5, 6],
            [4, 6, 7],
            [1, 0, 3],
            [1, 3, 2],
            [5, 1, 2],
            [5, 2, 6],
            [0, 4, 7],
            [0, 7, 3],
            [7, 6, 2],
            [7, 2, 3],
            [0, 1, 5],
            [0, 5, 4],
        ];
        Mesh::from_parts(vertices, faces)
    }

    #[test]
    fn test_cube_containment() {
        let mesh = unit_cube();
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.4, 0.4, 0.4),
            Point3::new(0.9, 0.0, 0.0),
            Point3::new(0.0, -0.8, 0.0),
        ];
        let mask = occupancy_mask(&mesh, &points).unwrap();
        assert_eq!(mask, vec![true, true, false, false]);
    }

    #[test]
    fn test_iou_identical_and_empty() {
        assert_eq!(volumetric_iou(&[true, false, true], &[true, false, true]), 1.0);
        assert_eq!(volumetric_iou(&[false, false], &[false, false]), 1.0);
        assert_eq!(volumetric_iou(&[true, false], &[false, true]), 0.0);
        let iou = volumetric_iou(&[true, true, false], &[true, false, false]);
        assert!((iou - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mesh_is_an_error() {
        let mesh = Mesh::new();
        assert!(occupancy_mask(&mesh, &[Point3::origin()]).is_err());
    }
}
