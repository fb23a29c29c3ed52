//! Error types for doct_data.

use std::path::PathBuf;

use doct_core::CoreError;
use doct_io::ShapeIoError;
use thiserror::Error;

/// Errors that can occur while loading or transforming shapes.
#[derive(Error, Debug)]
pub enum DataError {
    /// Reading a shape record failed.
    #[error("shape I/O error: {0}")]
    Io(#[from] ShapeIoError),

    /// Geometry construction failed.
    #[error("geometry error: {0}")]
    Core(#[from] CoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// A step is enabled but the raw record lacks its input.
    #[error("raw record has no '{field}'")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field that must be sampled from holds no rows.
    #[error("cannot sample from empty '{field}'")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// The large split indicators could not be loaded.
    #[error("split_large unavailable at {}: {reason}", path.display())]
    SplitUnavailable {
        /// File that failed to load.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The shape list could not be read.
    #[error("cannot read file list {}: {source}", path.display())]
    FileList {
        /// Path of the file list.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Sample index past the end of the dataset.
    #[error("index {index} out of range for {len} shapes")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of shapes.
        len: usize,
    },

    /// Tensor conversion with the wrong rank.
    #[error("tensor shape mismatch: expected rank {expected}, got shape {got:?}")]
    RankMismatch {
        /// Requested rank.
        expected: usize,
        /// Actual shape.
        got: Vec<usize>,
    },
}

/// Result type for doct_data operations.
pub type Result<T> = std::result::Result<T, DataError>;
