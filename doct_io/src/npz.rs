//! Typed access to `.npz` archives.
//!
//! Arrays are looked up under both `name` and `name.npy`, since archives
//! written by different tools disagree on the entry suffix. Float arrays are
//! read as `f32` with an `f64` fallback.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use doct_core::Point3;
use ndarray::{ArrayD, Ix2, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;

use crate::error::{open_file, Result, ShapeIoError};

/// An opened `.npz` archive.
pub struct NpzArchive {
    path: PathBuf,
    names: Vec<String>,
    reader: NpzReader<BufReader<File>>,
}

impl NpzArchive {
    /// Open an archive, mapping an unreadable file to `MissingFile`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_file(&path)?;
        let mut reader = NpzReader::new(BufReader::new(file))
            .map_err(|e| ShapeIoError::malformed(&path, format!("not a zip archive: {}", e)))?;
        let names = reader
            .names()
            .map_err(|e| ShapeIoError::malformed(&path, e.to_string()))?;
        Ok(Self {
            path,
            names,
            reader,
        })
    }

    /// Path of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Array names as stored in the archive.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// True if the archive holds an array called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    fn entry(&self, name: &str) -> Option<String> {
        let suffixed = format!("{}.npy", name);
        self.names
            .iter()
            .find(|n| n.as_str() == name || **n == suffixed)
            .cloned()
    }

    fn require(&self, name: &str) -> Result<String> {
        self.entry(name).ok_or_else(|| {
            ShapeIoError::malformed(
                &self.path,
                format!("missing array '{}' (found {:?})", name, self.names),
            )
        })
    }

    /// Read a float array as `f32`, accepting `f32` or `f64` storage.
    pub fn read_f32(&mut self, name: &str) -> Result<ArrayD<f32>> {
        let entry = self.require(name)?;
        match self.reader.by_name::<OwnedRepr<f32>, IxDyn>(&entry) {
            Ok(array) => Ok(array),
            Err(f32_err) => match self.reader.by_name::<OwnedRepr<f64>, IxDyn>(&entry) {
                Ok(array) => {
                    log::debug!("{}: '{}' stored as f64", self.path.display(), name);
                    Ok(array.mapv(|v| v as f32))
                }
                Err(_) => Err(ShapeIoError::malformed(
                    &self.path,
                    format!("array '{}' is not f32 or f64: {}", name, f32_err),
                )),
            },
        }
    }

    /// Read an `N x 3` float array as points.
    pub fn read_points(&mut self, name: &str) -> Result<Vec<Point3>> {
        let array = self.read_f32(name)?;
        let shape = array.shape().to_vec();
        let array = array
            .into_dimensionality::<Ix2>()
            .ok()
            .filter(|a| a.ncols() == 3)
            .ok_or_else(|| {
                ShapeIoError::malformed(
                    &self.path,
                    format!("array '{}' has shape {:?}, expected [N, 3]", name, shape),
                )
            })?;
        Ok(array
            .rows()
            .into_iter()
            .map(|r| Point3::new(r[0], r[1], r[2]))
            .collect())
    }

    /// Read an `N x C` float array as a flat row-major buffer plus `C`.
    pub fn read_rows(&mut self, name: &str) -> Result<(usize, Vec<f32>)> {
        let array = self.read_f32(name)?;
        let shape = array.shape().to_vec();
        let array = array.into_dimensionality::<Ix2>().map_err(|_| {
            ShapeIoError::malformed(
                &self.path,
                format!("array '{}' has shape {:?}, expected [N, C]", name, shape),
            )
        })?;
        let channels = array.ncols();
        Ok((channels, array.iter().copied().collect()))
    }

    /// Read an `N` or `N x 1` float array.
    pub fn read_scalars(&mut self, name: &str) -> Result<Vec<f32>> {
        let array = self.read_f32(name)?;
        match array.shape() {
            [_] | [_, 1] => Ok(array.iter().copied().collect()),
            shape => Err(ShapeIoError::malformed(
                &self.path,
                format!("array '{}' has shape {:?}, expected [N]", name, shape),
            )),
        }
    }

    /// Read a flag array stored as numpy `bool` or `u8`.
    ///
    /// Returns the raw bytes (`0`/`1` for `bool`) and the stored shape, so
    /// callers can tell packed from unpacked storage.
    pub fn read_bytes(&mut self, name: &str) -> Result<(Vec<usize>, Vec<u8>)> {
        let entry = self.require(name)?;
        if let Ok(array) = self.reader.by_name::<OwnedRepr<u8>, IxDyn>(&entry) {
            return Ok((array.shape().to_vec(), array.iter().copied().collect()));
        }
        match self.reader.by_name::<OwnedRepr<bool>, IxDyn>(&entry) {
            Ok(array) => Ok((
                array.shape().to_vec(),
                array.iter().map(|&b| u8::from(b)).collect(),
            )),
            Err(e) => Err(ShapeIoError::malformed(
                &self.path,
                format!("array '{}' is not bool or u8: {}", name, e),
            )),
        }
    }
}

impl std::fmt::Debug for NpzArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpzArchive")
            .field("path", &self.path)
            .field("names", &self.names)
            .finish()
    }
}
