// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Minimal NPZ/NPY reader for ground-truth fields
//!
//! Ground truth ships as numpy archives (`pointcloud.npz`, `points.npz`).
//! Only what those files actually contain is supported: little-endian
//! `<f2`/`<f4`/`<f8` floats, `|b1` booleans and `|u1` bytes (optionally
//! bit-packed with `numpy.packbits`), C-order, NPY format 1.x/2.x.

use crate::error::MetricError;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// One opened `.npz` archive
#[derive(Debug)]
pub struct NpzArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
}

/// Decoded array: dtype descriptor, shape, raw payload bytes
struct NpyArray {
    descr: String,
    shape: Vec<usize>,
    payload: Vec<u8>,
}

impl NpzArchive {
    pub fn open(path: &Path) -> Result<Self, MetricError> {
        if !path.exists() {
            return Err(MetricError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| MetricError::io(path, e))?;
        let archive = ZipArchive::new(file)
            .map_err(|e| MetricError::parse(path, format!("not a zip archive: {e}")))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Read an Nx3 float array as points
    pub fn points(&mut self, name: &str) -> Result<Vec<Point3<f64>>, MetricError> {
        let rows = self.float_rows(name)?;
        Ok(rows.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect())
    }

    /// Read an Nx3 float array as vectors (e.g. normals)
    pub fn vectors(&mut self, name: &str) -> Result<Vec<Vector3<f64>>, MetricError> {
        let rows = self.float_rows(name)?;
        Ok(rows
            .into_iter()
            .map(|[x, y, z]| Vector3::new(x, y, z))
            .collect())
    }

    /// Read a boolean array of `expected` entries.
    ///
    /// With `unpackbits` the payload holds `ceil(expected / 8)` bytes of
    /// MSB-first packed bits, the `numpy.packbits` convention.
    pub fn booleans(
        &mut self,
        name: &str,
        expected: usize,
        unpackbits: bool,
    ) -> Result<Vec<bool>, MetricError> {
        let array = self.entry(name)?;

        if unpackbits {
            if array.payload.len() * 8 < expected {
                return Err(self.bad_entry(name, "packed occupancy array too short"));
            }
            let mut bits = Vec::with_capacity(expected);
            for i in 0..expected {
                let byte = array.payload[i / 8];
                bits.push((byte >> (7 - i % 8)) & 1 == 1);
            }
            return Ok(bits);
        }

        let values = match array.descr.as_str() {
            "|b1" | "|u1" | "<u1" => array.payload.iter().map(|&b| b != 0).collect::<Vec<_>>(),
            _ => decode_floats(&array)
                .ok_or_else(|| self.bad_entry(name, format!("unsupported dtype {}", array.descr)))?
                .into_iter()
                .map(|v| v > 0.5)
                .collect(),
        };

        if values.len() < expected {
            return Err(self.bad_entry(name, "occupancy array too short"));
        }
        Ok(values[..expected].to_vec())
    }

    fn float_rows(&mut self, name: &str) -> Result<Vec<[f64; 3]>, MetricError> {
        let array = self.entry(name)?;
        if array.shape.len() != 2 || array.shape[1] != 3 {
            return Err(self.bad_entry(name, format!("expected Nx3 array, got {:?}", array.shape)));
        }

        let values = decode_floats(&array)
            .ok_or_else(|| self.bad_entry(name, format!("unsupported dtype {}", array.descr)))?;
        if values.len() != array.shape[0] * 3 {
            return Err(self.bad_entry(name, "payload size does not match shape"));
        }

        Ok(values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
    }

    fn entry(&mut self, name: &str) -> Result<NpyArray, MetricError> {
        // numpy stores each key with a .npy suffix
        let candidates = [format!("{name}.npy"), name.to_string()];
        let mut bytes = Vec::new();
        let mut found = false;
        for candidate in &candidates {
            if let Ok(mut entry) = self.archive.by_name(candidate) {
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| MetricError::io(&self.path, e))?;
                found = true;
                break;
            }
        }
        if !found {
            return Err(self.bad_entry(name, "missing archive entry"));
        }
        parse_npy(&self.path, &bytes)
    }

    fn bad_entry(&self, name: &str, details: impl Into<String>) -> MetricError {
        MetricError::parse(&self.path, format!("entry '{name}': {}", details.into()))
    }
}

fn parse_npy(path: &Path, bytes: &[u8]) -> Result<NpyArray, MetricError> {
    let bad = |details: &str| MetricError::parse(path, details.to_string());

    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(bad("not an NPY file"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(bad("truncated NPY header"));
            }
            (
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                12,
            )
        }
        _ => return Err(bad("unsupported NPY version")),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(bad("truncated NPY header"));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| bad("NPY header is not valid UTF-8"))?;

    let descr = extract_quoted(header, "'descr'").ok_or_else(|| bad("missing dtype descr"))?;
    let shape = extract_shape(header).ok_or_else(|| bad("missing shape"))?;

    if header.contains("'fortran_order': True") && shape.len() > 1 {
        return Err(bad("fortran-order arrays are not supported"));
    }

    Ok(NpyArray {
        descr,
        shape,
        payload: bytes[data_start..].to_vec(),
    })
}

fn extract_quoted(header: &str, key: &str) -> Option<String> {
    let rest = &header[header.find(key)? + key.len()..];
    let rest = &rest[rest.find(':')? + 1..];
    let open = rest.find('\'')?;
    let close = rest[open + 1..].find('\'')?;
    Some(rest[open + 1..open + 1 + close].to_string())
}

fn extract_shape(header: &str) -> Option<Vec<usize>> {
    let rest = &header[header.find("'shape'")?..];
    let open = rest.find('(')?;
    let close = rest.find(')')?;
    let mut shape = Vec::new();
    for part in rest[open + 1..close].split(',') {
        let part = part.trim();
        if !part.is_empty() {
            shape.push(part.parse().ok()?);
        }
    }
    Some(shape)
}

fn decode_floats(array: &NpyArray) -> Option<Vec<f64>> {
    let data = &array.payload;
    match array.descr.as_str() {
        "<f8" => Some(
            data.chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        "<f4" => Some(
            data.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
        ),
        "<f2" => Some(
            data.chunks_exact(2)
                .map(|c| half_to_f64(u16::from_le_bytes([c[0], c[1]])))
                .collect(),
        ),
        _ => None,
    }
}

/// IEEE 754 binary16 to f64
fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits >> 15 == 1 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let mantissa = (bits & 0x3ff) as f64;

    match exponent {
        0 => sign * mantissa * 2f64.powi(-24),
        0x1f => {
            if mantissa == 0.0 {
                sign * f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Serialize a C-order array into NPY 1.0 bytes
    pub fn npy_bytes(descr: &str, shape: &[usize], payload: &[u8]) -> Vec<u8> {
        let shape_str = match shape.len() {
            1 => format!("({},)", shape[0]),
            _ => format!(
                "({})",
                shape
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape_str}, }}"
        );
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut bytes = Vec::new();
        bytes.extend_from_slice(super::NPY_MAGIC);
        bytes.push(1);
        bytes.push(0);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    pub fn f4_payload(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Write an `.npz` with the given (key, npy bytes) entries
    pub fn write_npz(path: &Path, entries: &[(&str, Vec<u8>)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, bytes) in entries {
            writer
                .start_file(format!("{name}.npy"), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_points_and_normals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pointcloud.npz");

        let points = npy_bytes(
            "<f4",
            &[2, 3],
            &f4_payload(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]),
        );
        let normals = npy_bytes(
            "<f4",
            &[2, 3],
            &f4_payload(&[0.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        );
        write_npz(&path, &[("points", points), ("normals", normals)]);

        let mut npz = NpzArchive::open(&path).unwrap();
        let pts = npz.points("points").unwrap();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1], Point3::new(3.0, 4.0, 5.0));

        let nrm = npz.vectors("normals").unwrap();
        assert_eq!(nrm[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_packed_occupancies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.npz");

        // 10 bits packed MSB-first: 1100000001...
        let occ = npy_bytes("|u1", &[2], &[0b1100_0000, 0b0100_0000]);
        write_npz(&path, &[("occupancies", occ)]);

        let mut npz = NpzArchive::open(&path).unwrap();
        let bits = npz.booleans("occupancies", 10, true).unwrap();
        assert_eq!(bits.len(), 10);
        assert!(bits[0] && bits[1] && bits[9]);
        assert!(!bits[2] && !bits[8]);
    }

    #[test]
    fn test_unpacked_booleans() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.npz");
        let occ = npy_bytes("|b1", &[4], &[1, 0, 0, 1]);
        write_npz(&path, &[("occupancies", occ)]);

        let mut npz = NpzArchive::open(&path).unwrap();
        let bits = npz.booleans("occupancies", 4, false).unwrap();
        assert_eq!(bits, vec![true, false, false, true]);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = NpzArchive::open(&dir.path().join("nope.npz")).unwrap_err();
        assert!(matches!(err, MetricError::MissingFile(_)));
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.npz");
        write_npz(&path, &[("points", npy_bytes("<f4", &[1, 3], &f4_payload(&[0.0; 3])))]);

        let mut npz = NpzArchive::open(&path).unwrap();
        assert!(npz.points("normals").is_err());
    }

    #[test]
    fn test_half_floats() {
        // 1.0 = 0x3c00, -2.0 = 0xc000
        assert_eq!(half_to_f64(0x3c00), 1.0);
        assert_eq!(half_to_f64(0xc000), -2.0);
        assert_eq!(half_to_f64(0x0000), 0.0);
    }
}
