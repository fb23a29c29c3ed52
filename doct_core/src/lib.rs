//! # doct_core
//!
//! Geometry primitives for dual-octree shape data.
//!
//! This crate holds the dependency-free part of the pipeline: the vector type,
//! Morton keys, oriented point sets, and construction of the linear octree
//! that downstream networks consume as their input structure.
//!
//! ## Modules
//!
//! - [`types`]: `Point3` and the normalization epsilon
//! - [`morton`]: Morton keys, cell coordinates in `[-1, 1]^3`
//! - [`points`]: `PointSet` and `PointFeatures`
//! - [`octree`]: `Octree` build and queries
//! - [`error`]: Error types
//!
//! ## Usage
//!
//! ```ignore
//! use doct_core::prelude::*;
//!
//! let points = PointSet::new(positions, normals)?;
//! let octree = Octree::build(&points, 6, 2)?;
//! assert_eq!(octree.node_count(2), 64);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod morton;
pub mod octree;
pub mod points;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::morton::{
        cell_center, morton_decode_3d, morton_encode_3d, point_key, MAX_DEPTH, MAX_FULL_DEPTH,
    };
    pub use crate::octree::{check_depths, Octree, OctreeLevel};
    pub use crate::points::{PointFeatures, PointSet};
    pub use crate::types::{Point3, NORM_EPS};
}

pub use error::{CoreError, Result};
pub use morton::{
    ancestor_key, cell_center, cell_coords, compact_bits_3d, morton_decode_3d, morton_encode_3d,
    point_key, spread_bits_3d, MAX_DEPTH, MAX_FULL_DEPTH,
};
pub use octree::{check_depths, Octree, OctreeLevel};
pub use points::{PointFeatures, PointSet};
pub use types::{Point3, NORM_EPS};
