// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Area-weighted surface sampling

use super::{Mesh, PointSet};
use crate::error::MetricError;
use nalgebra::{Point3, Vector3};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

/// Draw `n` points uniformly from the surface of `mesh`, with the flat face
/// normal attached to each sample.
///
/// Faces are chosen with probability proportional to their area, then a
/// uniform point inside the chosen triangle is drawn via barycentric
/// coordinates. This avoids bias toward densely tessellated regions.
///
/// The caller owns the RNG, so a fixed seed gives reproducible samples.
pub fn sample_surface(mesh: &Mesh, n: usize, rng: &mut StdRng) -> Result<PointSet, MetricError> {
    let areas: Vec<f64> = (0..mesh.face_count()).map(|i| mesh.face_area(i)).collect();

    // Fails when the mesh has no faces or all areas are zero
    let face_dist = WeightedIndex::new(&areas).map_err(|_| MetricError::DegenerateMesh)?;

    let mut positions: Vec<Point3<f64>> = Vec::with_capacity(n);
    let mut normals: Vec<Vector3<f64>> = Vec::with_capacity(n);

    for _ in 0..n {
        let face = face_dist.sample(rng);
        let [p0, p1, p2] = mesh.face_points(face);

        let mut u: f64 = rng.gen();
        let mut v: f64 = rng.gen();
        // Fold samples outside the triangle back inside
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }

        positions.push(p0 + (p1 - p0) * u + (p2 - p0) * v);
        normals.push(mesh.face_normal(face));
    }

    Ok(PointSet::with_normals(positions, normals))
}
