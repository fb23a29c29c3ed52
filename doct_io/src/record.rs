//! On-disk shape records.
//!
//! A shape record is a directory holding one file per payload (see
//! [`layout`]). The readers here decode single files into typed arrays and
//! check their alignment; they do no geometric processing. The writers
//! produce the same layout and exist for tooling and tests.

use std::path::Path;

use doct_core::{Point3, PointFeatures};
use ndarray::{Array1, Array2};
use ndarray_npy::NpzWriter;

use crate::error::{create_file, Result, ShapeIoError};
use crate::npz::NpzArchive;

/// File names of a shape record, relative to its directory.
pub mod layout {
    /// Serialized input octree.
    pub const OCTREE: &str = "octree.pth";
    /// Surface points and normals.
    pub const POINT_CLOUD: &str = "pointcloud.npz";
    /// Per-point colors.
    pub const COLOR: &str = "color.npz";
    /// Small split indicators.
    pub const SPLIT_SMALL: &str = "split_small.pth";
    /// Large split indicators.
    pub const SPLIT_LARGE: &str = "split_large.pth";
    /// Occupancy samples.
    pub const OCCUPANCY: &str = "points.npz";
    /// Signed distance samples.
    pub const SDF: &str = "sdf.npz";
}

/// Surface points as stored, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPointCloud {
    /// Positions in the record's own scale.
    pub points: Vec<Point3>,
    /// Per-point normals, not necessarily unit length.
    pub normals: Vec<Point3>,
    /// Per-point colors; `None` when colors were not requested.
    pub colors: Option<PointFeatures>,
}

impl RawPointCloud {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Signed distance samples with gradients.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfField {
    /// Query positions in the record's own scale.
    pub points: Vec<Point3>,
    /// SDF gradient per position.
    pub grad: Vec<Point3>,
    /// Signed distance per position.
    pub sdf: Vec<f32>,
}

impl SdfField {
    /// Assemble a field, checking that the columns line up.
    pub fn new(points: Vec<Point3>, grad: Vec<Point3>, sdf: Vec<f32>) -> Result<Self> {
        for (what, got) in [("grad", grad.len()), ("sdf", sdf.len())] {
            if got != points.len() {
                return Err(doct_core::CoreError::LengthMismatch {
                    what,
                    expected: points.len(),
                    got,
                }
                .into());
            }
        }
        Ok(Self { points, grad, sdf })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the field holds no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Inside/outside labels at query positions.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyField {
    /// Query positions.
    pub points: Vec<Point3>,
    /// True where the position is inside the shape.
    pub occupancies: Vec<bool>,
}

/// A dense f32 tensor of arbitrary shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl SplitTensor {
    /// Wrap values with a shape whose product is `values.len()`.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(*d))
            .ok_or_else(|| ShapeIoError::InvalidFormat {
                message: format!("tensor shape {:?} overflows", shape),
            })?;
        if expected != values.len() {
            return Err(ShapeIoError::InvalidFormat {
                message: format!(
                    "tensor shape {:?} needs {} values, got {}",
                    shape,
                    expected,
                    values.len()
                ),
            });
        }
        Ok(Self { shape, values })
    }

    /// Tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Read `points` and `normals` from a point cloud archive.
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<RawPointCloud> {
    let mut archive = NpzArchive::open(path)?;
    let points = archive.read_points("points")?;
    let normals = archive.read_points("normals")?;
    check_rows(archive.path(), "normals", points.len(), normals.len())?;
    check_finite(archive.path(), "points", &points)?;
    check_finite(archive.path(), "normals", &normals)?;
    Ok(RawPointCloud {
        points,
        normals,
        colors: None,
    })
}

/// Read `colors` from a color archive, checking it has `rows` rows.
pub fn read_colors<P: AsRef<Path>>(path: P, rows: usize) -> Result<PointFeatures> {
    let mut archive = NpzArchive::open(path)?;
    let (channels, values) = archive.read_rows("colors")?;
    let features = PointFeatures::new(channels, values)?;
    check_rows(archive.path(), "colors", rows, features.rows())?;
    Ok(features)
}

/// Read `points`, `grad` and `sdf` from an SDF archive.
pub fn read_sdf_field<P: AsRef<Path>>(path: P) -> Result<SdfField> {
    let mut archive = NpzArchive::open(path)?;
    let points = archive.read_points("points")?;
    let grad = archive.read_points("grad")?;
    let sdf = archive.read_scalars("sdf")?;
    SdfField::new(points, grad, sdf).map_err(|e| e.at_path(archive.path()))
}

/// Read `points` and `occupancies` from an occupancy archive.
///
/// Occupancies may be stored one per sample (`bool` or `u8`) or bit packed
/// with `np.packbits`. Packed storage is recognized when the byte count is
/// `ceil(M / 8)` and differs from `M`.
pub fn read_occupancy<P: AsRef<Path>>(path: P) -> Result<OccupancyField> {
    let mut archive = NpzArchive::open(path)?;
    let points = archive.read_points("points")?;
    let (_, bytes) = archive.read_bytes("occupancies")?;

    let m = points.len();
    let occupancies = if bytes.len() == m {
        bytes.iter().map(|&b| b != 0).collect()
    } else if bytes.len() == m.div_ceil(8) {
        unpack_bits(&bytes, m)
    } else {
        return Err(ShapeIoError::malformed(
            archive.path(),
            format!(
                "occupancies has {} entries for {} points (packed would be {})",
                bytes.len(),
                m,
                m.div_ceil(8)
            ),
        ));
    };

    Ok(OccupancyField {
        points,
        occupancies,
    })
}

/// Unpack `count` MSB-first bits.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes[i / 8] & (0x80 >> (i % 8)) != 0)
        .collect()
}

/// Pack bits MSB first, zero padding the last byte.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, _) in bits.iter().enumerate().filter(|(_, b)| **b) {
        bytes[i / 8] |= 0x80 >> (i % 8);
    }
    bytes
}

/// Write a point cloud archive.
pub fn write_point_cloud<P: AsRef<Path>>(
    path: P,
    points: &[Point3],
    normals: &[Point3],
) -> Result<()> {
    check_rows(path.as_ref(), "normals", points.len(), normals.len())?;
    write_npz(path.as_ref(), |w| {
        w.add_array("points", &points_array(points))?;
        w.add_array("normals", &points_array(normals))?;
        Ok(())
    })
}

/// Write a color archive.
pub fn write_colors<P: AsRef<Path>>(path: P, colors: &PointFeatures) -> Result<()> {
    let array =
        Array2::from_shape_vec((colors.rows(), colors.channels()), colors.values().to_vec())
            .map_err(|e| ShapeIoError::InvalidFormat {
                message: e.to_string(),
            })?;
    write_npz(path.as_ref(), |w| w.add_array("colors", &array))
}

/// Write an SDF archive.
pub fn write_sdf_field<P: AsRef<Path>>(path: P, field: &SdfField) -> Result<()> {
    let sdf = Array1::from_vec(field.sdf.clone());
    write_npz(path.as_ref(), |w| {
        w.add_array("points", &points_array(&field.points))?;
        w.add_array("grad", &points_array(&field.grad))?;
        w.add_array("sdf", &sdf)?;
        Ok(())
    })
}

/// Write an occupancy archive, bit packed when `packed` is set.
pub fn write_occupancy<P: AsRef<Path>>(
    path: P,
    field: &OccupancyField,
    packed: bool,
) -> Result<()> {
    check_rows(
        path.as_ref(),
        "occupancies",
        field.points.len(),
        field.occupancies.len(),
    )?;
    let bytes = if packed {
        pack_bits(&field.occupancies)
    } else {
        field.occupancies.iter().map(|&b| u8::from(b)).collect()
    };
    let bytes = Array1::from_vec(bytes);
    write_npz(path.as_ref(), |w| {
        w.add_array("points", &points_array(&field.points))?;
        w.add_array("occupancies", &bytes)?;
        Ok(())
    })
}

fn points_array(points: &[Point3]) -> Array2<f32> {
    Array2::from_shape_fn((points.len(), 3), |(i, j)| points[i].as_array()[j])
}

fn write_npz<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut NpzWriter<std::fs::File>) -> std::result::Result<(), ndarray_npy::WriteNpzError>,
{
    let mut writer = NpzWriter::new(create_file(path)?);
    fill(&mut writer)
        .and_then(|_| writer.finish().map(|_| ()))
        .map_err(|e| ShapeIoError::ArchiveWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn check_rows(path: &Path, what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ShapeIoError::malformed(
            path,
            format!("{} has {} rows, expected {}", what, got, expected),
        ));
    }
    Ok(())
}

fn check_finite(path: &Path, what: &str, rows: &[Point3]) -> Result<()> {
    if let Some(row) = rows.iter().position(|p| !p.is_finite()) {
        return Err(ShapeIoError::malformed(
            path,
            format!("{} row {} is not finite", what, row),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_bits() {
        let bits = [true, false, true, true, false, false, false, true, true, false];
        let packed = pack_bits(&bits);
        assert_eq!(packed, vec![0b1011_0001, 0b1000_0000]);
        assert_eq!(unpack_bits(&packed, bits.len()), bits.to_vec());
    }

    #[test]
    fn test_sdf_field_alignment() {
        let p = vec![Point3::ZERO; 3];
        assert!(SdfField::new(p.clone(), p.clone(), vec![0.0; 3]).is_ok());
        assert!(SdfField::new(p.clone(), p.clone(), vec![0.0; 2]).is_err());
        assert!(SdfField::new(p.clone(), vec![Point3::ZERO; 4], vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_split_tensor_shape_check() {
        let t = SplitTensor::new(vec![2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(t.rank(), 2);
        assert!(SplitTensor::new(vec![2, 3], vec![0.0; 5]).is_err());
        // Rank 0 holds a single scalar
        assert!(SplitTensor::new(Vec::new(), vec![1.0]).is_ok());
    }
}
