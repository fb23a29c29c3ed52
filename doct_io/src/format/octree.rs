//! Octree container read/write.
//!
//! # Format Specification
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ HEADER (32 bytes)                                                  │
//! │  magic "DOCT", fields = [depth, full_depth, channels, leaves]      │
//! │  flags bit 0 = leaf features present                               │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ LEVELS, for d in 0..=depth                                         │
//! │  u32 node count n                                                  │
//! │  u64 keys (n), i32 children (n)                                    │
//! ├────────────────────────────────────────────────────────────────────┤
//! │ LEAF PAYLOAD                                                       │
//! │  normals (leaves x 3 f32), points (leaves x 3 f32)                 │
//! │  features (leaves x channels f32), if flagged                      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::{Read, Write};
use std::path::Path;

use doct_core::{Octree, Point3, PointFeatures, MAX_DEPTH};

use super::header::{ContainerHeader, FLAG_HAS_FEATURES, OCTREE_MAGIC};
use super::{read_f32s, read_header, read_i32s, read_u32s, read_u64s, to_u32};
use crate::error::{create_file, open_file, Result, ShapeIoError};

/// Save an octree to a writer.
pub fn save_octree<W: Write>(octree: &Octree, writer: &mut W) -> Result<()> {
    let features = octree.leaf_features();
    let channels = features.map_or(0, PointFeatures::channels);
    let flags = if features.is_some() { FLAG_HAS_FEATURES } else { 0 };

    let header = ContainerHeader::new(
        OCTREE_MAGIC,
        flags,
        [
            octree.depth(),
            octree.full_depth(),
            to_u32(channels, "feature channels")?,
            to_u32(octree.leaf_points().len(), "leaf count")?,
        ],
    );
    writer.write_all(&header.to_bytes())?;

    for level in octree.levels() {
        writer.write_all(&to_u32(level.len(), "node count")?.to_le_bytes())?;
        for key in level.keys() {
            writer.write_all(&key.to_le_bytes())?;
        }
        for child in level.children() {
            writer.write_all(&child.to_le_bytes())?;
        }
    }

    write_points(writer, octree.leaf_normals())?;
    write_points(writer, octree.leaf_points())?;
    if let Some(features) = features {
        for v in features.values() {
            writer.write_all(&v.to_le_bytes())?;
        }
    }

    Ok(())
}

/// Load an octree from a reader.
///
/// The decoded arrays go through [`Octree::from_parts`], so a container
/// that does not describe a consistent octree is rejected.
pub fn load_octree<R: Read>(reader: &mut R) -> Result<Octree> {
    let header = read_header(reader, OCTREE_MAGIC)?;
    let [depth, full_depth, channels, leaves] = header.fields;
    if depth > MAX_DEPTH {
        return Err(ShapeIoError::InvalidFormat {
            message: format!("depth {} exceeds {}", depth, MAX_DEPTH),
        });
    }
    let channels = channels as usize;
    let leaves = leaves as usize;

    let mut levels = Vec::with_capacity(depth as usize + 1);
    for _ in 0..=depth {
        let n = read_u32s(reader, 1, "node count")?[0] as usize;
        let keys = read_u64s(reader, n, "keys")?;
        let children = read_i32s(reader, n, "children")?;
        levels.push((keys, children));
    }

    let normals = read_points(reader, leaves, "leaf normals")?;
    let points = read_points(reader, leaves, "leaf points")?;
    let features = if header.has_flag(FLAG_HAS_FEATURES) {
        let values = read_f32s(reader, leaves.saturating_mul(channels), "leaf features")?;
        Some(PointFeatures::new(channels, values)?)
    } else {
        None
    };

    Ok(Octree::from_parts(
        depth, full_depth, levels, normals, points, features,
    )?)
}

/// Save an octree to a file path.
pub fn save_octree_file<P: AsRef<Path>>(octree: &Octree, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::io::BufWriter::new(create_file(path)?);
    save_octree(octree, &mut file)
        .and_then(|_| file.flush().map_err(ShapeIoError::from))
        .map_err(|e| ShapeIoError::ArchiveWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load an octree from a file path.
pub fn load_octree_file<P: AsRef<Path>>(path: P) -> Result<Octree> {
    let path = path.as_ref();
    let mut file = std::io::BufReader::new(open_file(path)?);
    load_octree(&mut file).map_err(|e| e.at_path(path))
}

fn write_points<W: Write>(writer: &mut W, points: &[Point3]) -> Result<()> {
    for p in points {
        for v in p.as_array() {
            writer.write_all(&v.to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_points<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<Point3>> {
    let values = read_f32s(reader, count.saturating_mul(3), what)?;
    Ok(values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}
