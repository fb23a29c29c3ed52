//! # doct_data
//!
//! Turns dual-octree shape records into training samples.
//!
//! This crate provides:
//! - [`ShapeLoader`]: reads the payloads enabled in a [`ShapeConfig`]
//! - [`ShapeTransform`]: normalizes points, passes through octree and split
//!   data, and draws SDF supervision
//! - [`ShapeDataset`]: a burn [`Dataset`](burn::data::dataset::Dataset)
//!   over a file list of records
//!
//! ## Example
//!
//! ```ignore
//! use doct_data::prelude::*;
//! use rand::SeedableRng;
//!
//! let config = ShapeConfig::new().with_sample_surf_points(true);
//! let loader = ShapeLoader::new(&config);
//! let transform = ShapeTransform::new(config)?;
//!
//! let raw = loader.load("data/02691156/1a04")?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let sample = transform.apply(&raw, 0, &mut rng)?;
//! let tensors = sample.sdf.unwrap().to_tensors::<NdArray>(&device);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod raw;
pub mod sample;
pub mod sampling;
pub mod transform;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{DatasetConfig, ShapeConfig};
    pub use crate::dataset::{build_shapenet_dataset, ShapeDataset};
    pub use crate::error::{DataError, Result};
    pub use crate::loader::ShapeLoader;
    pub use crate::raw::{RawShape, SplitLoadFailure};
    pub use crate::sample::{SdfSampleTensors, SdfSamples, SplitTensorExt, TrainingSample};
    pub use crate::transform::ShapeTransform;
}

pub use config::{DatasetConfig, ShapeConfig};
pub use dataset::{build_shapenet_dataset, read_filelist, ShapeDataset};
pub use error::{DataError, Result};
pub use loader::ShapeLoader;
pub use raw::{RawShape, SplitLoadFailure};
pub use sample::{points_tensor, SdfSampleTensors, SdfSamples, SplitTensorExt, TrainingSample};
pub use transform::ShapeTransform;
