//! Configuration types for doct_data.
//!
//! Burn-style configuration structs, loadable from and savable to JSON
//! through [`burn::config::Config`].

mod dataset;
mod shape;

pub use dataset::DatasetConfig;
pub use shape::ShapeConfig;
