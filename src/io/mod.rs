// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! I/O module - candidate mesh/point-cloud import and NPZ ground truth

mod mesh_import;
mod npz;
mod pointcloud;

pub use mesh_import::load_mesh;
pub use npz::NpzArchive;
pub use pointcloud::load_pointcloud;
