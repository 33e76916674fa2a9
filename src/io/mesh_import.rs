// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Candidate mesh import (OBJ, OFF, STL, PLY)

use crate::error::MetricError;
use crate::geometry::Mesh;
use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load a generated mesh, dispatching on the file extension.
///
/// Invalid faces (out-of-range or repeated indices) are dropped rather than
/// rejected; a mesh that ends up with no usable faces is returned as-is and
/// handled by the degenerate-mesh sentinel path downstream.
pub fn load_mesh(path: &Path) -> Result<Mesh, MetricError> {
    if !path.exists() {
        return Err(MetricError::MissingFile(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mut mesh = match extension.as_str() {
        "obj" => load_obj(path),
        "off" => load_off(path),
        "stl" => load_stl(path),
        "ply" => load_ply(path),
        other => Err(MetricError::parse(
            path,
            format!("unsupported mesh format '{other}'"),
        )),
    }?;

    mesh.retain_valid_faces();
    Ok(mesh)
}

fn open_reader(path: &Path) -> Result<BufReader<File>, MetricError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| MetricError::io(path, e))
}

fn load_obj(path: &Path) -> Result<Mesh, MetricError> {
    let reader = open_reader(path)?;
    let mut mesh = Mesh::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| MetricError::io(path, e))?;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let coords = parse_floats(&mut tokens, 3).ok_or_else(|| {
                    MetricError::parse(path, format!("invalid vertex on line {}", line_no + 1))
                })?;
                mesh.vertices
                    .push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let mut indices = Vec::new();
                for token in tokens {
                    // "v", "v/vt", "v//vn", "v/vt/vn" all start with the
                    // vertex index; negative values are relative
                    let head = token.split('/').next().unwrap_or("");
                    let raw: i64 = head.parse().map_err(|_| {
                        MetricError::parse(path, format!("invalid face on line {}", line_no + 1))
                    })?;
                    let index = if raw < 0 {
                        mesh.vertices.len() as i64 + raw
                    } else {
                        raw - 1
                    };
                    if index < 0 {
                        return Err(MetricError::parse(
                            path,
                            format!("invalid face index on line {}", line_no + 1),
                        ));
                    }
                    indices.push(index as usize);
                }
                push_fan(&mut mesh, &indices);
            }
            _ => {} // normals, texcoords, groups, comments
        }
    }

    Ok(mesh)
}

fn load_off(path: &Path) -> Result<Mesh, MetricError> {
    let reader = open_reader(path)?;
    let mut lines = reader.lines().filter_map(|line| match line {
        Ok(l) => {
            let trimmed = l.trim().to_string();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                None
            } else {
                Some(Ok(trimmed))
            }
        }
        Err(e) => Some(Err(e)),
    });

    let bad = |details: &str| MetricError::parse(path, details.to_string());
    let mut next_line = |what: &str| -> Result<String, MetricError> {
        lines
            .next()
            .transpose()
            .map_err(|e| MetricError::io(path, e))?
            .ok_or_else(|| MetricError::parse(path, format!("unexpected end of file, expected {what}")))
    };

    // Header may be "OFF" alone or "OFF nv nf ne" on one line
    let header = next_line("OFF header")?;
    let counts_line = if let Some(rest) = header.strip_prefix("OFF") {
        let rest = rest.trim();
        if rest.is_empty() {
            next_line("element counts")?
        } else {
            rest.to_string()
        }
    } else {
        return Err(bad("missing OFF header"));
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .take(2)
        .map(|t| t.parse())
        .collect::<Result<_, _>>()
        .map_err(|_| bad("invalid element counts"))?;
    if counts.len() != 2 {
        return Err(bad("invalid element counts"));
    }
    let (n_vertices, n_faces) = (counts[0], counts[1]);

    let mut mesh = Mesh::new();
    for _ in 0..n_vertices {
        let line = next_line("vertex")?;
        let mut tokens = line.split_whitespace();
        let coords = parse_floats(&mut tokens, 3).ok_or_else(|| bad("invalid vertex"))?;
        mesh.vertices
            .push(Point3::new(coords[0], coords[1], coords[2]));
    }

    for _ in 0..n_faces {
        let line = next_line("face")?;
        let mut tokens = line.split_whitespace();
        let arity: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| bad("invalid face"))?;
        let indices: Vec<usize> = tokens
            .take(arity)
            .map(|t| t.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| bad("invalid face index"))?;
        if indices.len() != arity {
            return Err(bad("truncated face"));
        }
        push_fan(&mut mesh, &indices);
    }

    Ok(mesh)
}

fn load_stl(path: &Path) -> Result<Mesh, MetricError> {
    let mut file = File::open(path).map_err(|e| MetricError::io(path, e))?;
    let stl = stl_io::read_stl(&mut file).map_err(|e| MetricError::io(path, e))?;

    let vertices = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let faces = stl.faces.iter().map(|f| f.vertices).collect();

    Ok(Mesh::from_parts(vertices, faces))
}

fn load_ply(path: &Path) -> Result<Mesh, MetricError> {
    let mut reader = open_reader(path)?;
    let ply = Parser::<DefaultElement>::new()
        .read_ply(&mut reader)
        .map_err(|e| MetricError::parse(path, format!("PLY parse error: {e:?}")))?;

    let mut mesh = Mesh::new();

    if let Some(vertices) = ply.payload.get("vertex") {
        for element in vertices {
            let x = prop_f64(element.get("x"));
            let y = prop_f64(element.get("y"));
            let z = prop_f64(element.get("z"));
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => mesh.vertices.push(Point3::new(x, y, z)),
                _ => return Err(MetricError::parse(path, "vertex without x/y/z")),
            }
        }
    }

    if let Some(faces) = ply.payload.get("face") {
        for element in faces {
            let indices = element
                .get("vertex_indices")
                .or_else(|| element.get("vertex_index"))
                .and_then(prop_index_list)
                .ok_or_else(|| MetricError::parse(path, "face without vertex indices"))?;
            push_fan(&mut mesh, &indices);
        }
    }

    Ok(mesh)
}

/// Fan-triangulate a polygon (no-op below three corners)
fn push_fan(mesh: &mut Mesh, indices: &[usize]) {
    for i in 1..indices.len().saturating_sub(1) {
        mesh.faces.push([indices[0], indices[i], indices[i + 1]]);
    }
}

fn parse_floats<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    count: usize,
) -> Option<Vec<f64>> {
    let values: Vec<f64> = tokens
        .take(count)
        .map(|t| t.parse().ok())
        .collect::<Option<_>>()?;
    (values.len() == count).then_some(values)
}

pub(crate) fn prop_f64(property: Option<&Property>) -> Option<f64> {
    match property? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        _ => None,
    }
}

fn prop_index_list(property: &Property) -> Option<Vec<usize>> {
    match property {
        Property::ListInt(v) => v.iter().map(|&i| usize::try_from(i).ok()).collect(),
        Property::ListUInt(v) => Some(v.iter().map(|&i| i as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&i| i as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&i| i as usize).collect()),
        Property::ListShort(v) => v.iter().map(|&i| usize::try_from(i).ok()).collect(),
        _ => None,
    }
}
