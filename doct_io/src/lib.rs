//! # doct_io
//!
//! Storage for dual-octree shape records.
//!
//! This crate provides:
//! - Typed readers and writers for the `.npz` archives of a shape record
//! - Binary containers for octrees and split tensors
//!
//! ## Shape record layout
//!
//! A record is a directory; see [`record::layout`] for the file names.
//! Every reader maps an unopenable file to [`ShapeIoError::MissingFile`] and
//! any content problem to [`ShapeIoError::MalformedArchive`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format;
pub mod npz;
pub mod record;

pub use error::{Result, ShapeIoError};
pub use format::{
    load_octree, load_octree_file, load_tensor, load_tensor_file, save_octree, save_octree_file,
    save_tensor, save_tensor_file, ContainerHeader,
};
pub use npz::NpzArchive;
pub use record::{
    layout, pack_bits, read_colors, read_occupancy, read_point_cloud, read_sdf_field, unpack_bits,
    write_colors, write_occupancy, write_point_cloud, write_sdf_field, OccupancyField,
    RawPointCloud, SdfField, SplitTensor,
};
