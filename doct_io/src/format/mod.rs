//! Binary containers for octrees and split tensors.
//!
//! Both formats start with a 32-byte [`ContainerHeader`] and store every
//! scalar little endian. Loading never trusts the header counts for
//! allocation: payloads are read through a bounded reader and a short read
//! is reported as a format error.
//!
//! # Example
//!
//! ```ignore
//! use doct_io::format::{load_octree_file, save_octree_file};
//!
//! save_octree_file(&octree, dir.join("octree.pth"))?;
//! let restored = load_octree_file(dir.join("octree.pth"))?;
//! assert_eq!(restored, octree);
//! ```

pub mod header;
pub mod octree;
pub mod tensor;

use std::io::Read;

use crate::error::{Result, ShapeIoError};

pub use header::{
    ContainerHeader, FLAG_HAS_FEATURES, FORMAT_VERSION, HEADER_SIZE, OCTREE_MAGIC, TENSOR_MAGIC,
};
pub use octree::{load_octree, load_octree_file, save_octree, save_octree_file};
pub use tensor::{load_tensor, load_tensor_file, save_tensor, save_tensor_file};

/// Read and check a header with the given magic.
pub(crate) fn read_header<R: Read>(reader: &mut R, magic: [u8; 4]) -> Result<ContainerHeader> {
    let mut bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut bytes).map_err(|_| ShapeIoError::InvalidFormat {
        message: "truncated header".into(),
    })?;
    let header = ContainerHeader::from_bytes(&bytes);
    if !header.is_valid(magic) {
        return Err(ShapeIoError::InvalidFormat {
            message: format!(
                "expected magic {:?} v{}, found {:?} v{}",
                String::from_utf8_lossy(&magic),
                FORMAT_VERSION,
                String::from_utf8_lossy(&header.magic),
                header.version
            ),
        });
    }
    Ok(header)
}

/// Read exactly `count` elements of `size` bytes each.
fn read_block<R: Read>(reader: &mut R, count: usize, size: usize, what: &str) -> Result<Vec<u8>> {
    let len = count
        .checked_mul(size)
        .ok_or_else(|| ShapeIoError::InvalidFormat {
            message: format!("{} count {} overflows", what, count),
        })?;
    let mut buf = Vec::new();
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(ShapeIoError::InvalidFormat {
            message: format!("truncated {}: expected {} bytes, got {}", what, len, buf.len()),
        });
    }
    Ok(buf)
}

pub(crate) fn read_u32s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<u32>> {
    let buf = read_block(reader, count, 4, what)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub(crate) fn read_i32s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<i32>> {
    let buf = read_block(reader, count, 4, what)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub(crate) fn read_u64s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<u64>> {
    let buf = read_block(reader, count, 8, what)?;
    Ok(buf
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

pub(crate) fn read_f32s<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<f32>> {
    let buf = read_block(reader, count, 4, what)?;
    Ok(buf
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Convert a length to the u32 stored on disk.
pub(crate) fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| ShapeIoError::InvalidFormat {
        message: format!("{} {} does not fit in u32", what, value),
    })
}
