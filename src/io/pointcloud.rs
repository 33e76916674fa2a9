// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! PLY point-cloud import

use super::mesh_import::prop_f64;
use crate::error::MetricError;
use crate::geometry::PointSet;
use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::DefaultElement;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load a generated point cloud from a PLY file.
///
/// Normals (`nx`/`ny`/`nz`) are attached only when every vertex carries
/// them; point-cloud evaluation then reports normal consistency as well.
pub fn load_pointcloud(path: &Path) -> Result<PointSet, MetricError> {
    if !path.exists() {
        return Err(MetricError::MissingFile(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| MetricError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let ply = Parser::<DefaultElement>::new()
        .read_ply(&mut reader)
        .map_err(|e| MetricError::parse(path, format!("PLY parse error: {e:?}")))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MetricError::parse(path, "no vertex element"))?;

    let mut positions = Vec::with_capacity(vertices.len());
    let mut normals = Vec::with_capacity(vertices.len());
    let mut all_normals = true;

    for element in vertices {
        let x = prop_f64(element.get("x"));
        let y = prop_f64(element.get("y"));
        let z = prop_f64(element.get("z"));
        match (x, y, z) {
            (Some(x), Some(y), Some(z)) => positions.push(Point3::new(x, y, z)),
            _ => return Err(MetricError::parse(path, "vertex without x/y/z")),
        }

        let nx = prop_f64(element.get("nx"));
        let ny = prop_f64(element.get("ny"));
        let nz = prop_f64(element.get("nz"));
        match (nx, ny, nz) {
            (Some(nx), Some(ny), Some(nz)) => {
                let normal = Vector3::new(nx, ny, nz);
                let len = normal.norm();
                normals.push(if len > 0.0 { normal / len } else { normal });
            }
            _ => all_normals = false,
        }
    }

    if all_normals && !positions.is_empty() {
        Ok(PointSet::with_normals(positions, normals))
    } else {
        Ok(PointSet::new(positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_ascii_ply(path: &Path, with_normals: bool) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "ply").unwrap();
        writeln!(file, "format ascii 1.0").unwrap();
        writeln!(file, "element vertex 2").unwrap();
        writeln!(file, "property float x").unwrap();
        writeln!(file, "property float y").unwrap();
        writeln!(file, "property float z").unwrap();
        if with_normals {
            writeln!(file, "property float nx").unwrap();
            writeln!(file, "property float ny").unwrap();
            writeln!(file, "property float nz").unwrap();
        }
        writeln!(file, "end_header").unwrap();
        if with_normals {
            writeln!(file, "0 0 0 0 0 1").unwrap();
            writeln!(file, "1 2 3 0 1 0").unwrap();
        } else {
            writeln!(file, "0 0 0").unwrap();
            writeln!(file, "1 2 3").unwrap();
        }
    }

    #[test]
    fn test_load_with_normals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cloud.ply");
        write_ascii_ply(&path, true);

        let cloud = load_pointcloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert!(cloud.has_normals());
        assert_eq!(cloud.positions[1], Point3::new(1.0, 2.0, 3.0));
        assert_eq!(cloud.normals.unwrap()[1], Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_load_without_normals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cloud.ply");
        write_ascii_ply(&path, false);

        let cloud = load_pointcloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert!(!cloud.has_normals());
    }

    #[test]
    fn test_missing_file() {
        let err = load_pointcloud(Path::new("/nonexistent/cloud.ply")).unwrap_err();
        assert!(matches!(err, MetricError::MissingFile(_)));
    }
}
