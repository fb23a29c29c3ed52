//! Tensor container read/write.
//!
//! Layout: header (magic "DTNS", fields `[rank, element_count, 0, 0]`),
//! then `rank` u32 dims, then `element_count` f32 values in row-major order.

use std::io::{Read, Write};
use std::path::Path;

use super::header::{ContainerHeader, TENSOR_MAGIC};
use super::{read_f32s, read_header, read_u32s, to_u32};
use crate::error::{create_file, open_file, Result, ShapeIoError};
use crate::record::SplitTensor;

/// Save a tensor to a writer.
pub fn save_tensor<W: Write>(tensor: &SplitTensor, writer: &mut W) -> Result<()> {
    let header = ContainerHeader::new(
        TENSOR_MAGIC,
        0,
        [
            to_u32(tensor.rank(), "rank")?,
            to_u32(tensor.values().len(), "element count")?,
            0,
            0,
        ],
    );
    writer.write_all(&header.to_bytes())?;
    for &dim in tensor.shape() {
        writer.write_all(&to_u32(dim, "dimension")?.to_le_bytes())?;
    }
    for v in tensor.values() {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Load a tensor from a reader.
pub fn load_tensor<R: Read>(reader: &mut R) -> Result<SplitTensor> {
    let header = read_header(reader, TENSOR_MAGIC)?;
    let [rank, count, _, _] = header.fields;
    let shape: Vec<usize> = read_u32s(reader, rank as usize, "dims")?
        .into_iter()
        .map(|d| d as usize)
        .collect();
    let values = read_f32s(reader, count as usize, "values")?;
    SplitTensor::new(shape, values)
}

/// Save a tensor to a file path.
pub fn save_tensor_file<P: AsRef<Path>>(tensor: &SplitTensor, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::io::BufWriter::new(create_file(path)?);
    save_tensor(tensor, &mut file)
        .and_then(|_| file.flush().map_err(ShapeIoError::from))
        .map_err(|e| ShapeIoError::ArchiveWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load a tensor from a file path.
pub fn load_tensor_file<P: AsRef<Path>>(path: P) -> Result<SplitTensor> {
    let path = path.as_ref();
    let mut file = std::io::BufReader::new(open_file(path)?);
    load_tensor(&mut file).map_err(|e| e.at_path(path))
}
