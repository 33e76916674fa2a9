// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Geometry module - mesh and point-set representation, sampling, occupancy

mod bbox;
mod mesh;
mod occupancy;
mod pointset;
mod sampler;

pub use bbox::BoundingBox;
pub use mesh::Mesh;
pub use occupancy::{occupancy_mask, volumetric_iou};
pub use pointset::PointSet;
pub use sampler::sample_surface;
