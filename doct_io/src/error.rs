//! Error types for doct_io operations.

use std::path::{Path, PathBuf};

use doct_core::CoreError;
use thiserror::Error;

/// Errors that can occur while reading or writing shape records.
#[derive(Error, Debug)]
pub enum ShapeIoError {
    /// A backing file could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    MissingFile {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file exists but its content is not a valid record.
    #[error("malformed archive {}: {message}", path.display())]
    MalformedArchive {
        /// Offending file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Writing an archive failed.
    #[error("cannot write {}: {message}", path.display())]
    ArchiveWrite {
        /// Target file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Container bytes do not follow the format.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error.
        message: String,
    },

    /// I/O error during serialization/deserialization.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoded data violates a geometry invariant.
    #[error("invalid geometry: {0}")]
    Core(#[from] CoreError),
}

impl ShapeIoError {
    /// Re-attribute a content error to the file it came from.
    ///
    /// `MissingFile` and errors already carrying a path pass through.
    pub fn at_path(self, path: &Path) -> Self {
        match self {
            err @ (ShapeIoError::MissingFile { .. }
            | ShapeIoError::MalformedArchive { .. }
            | ShapeIoError::ArchiveWrite { .. }) => err,
            other => ShapeIoError::MalformedArchive {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }

    /// Build a `MalformedArchive` for `path`.
    pub fn malformed(path: &Path, message: impl Into<String>) -> Self {
        ShapeIoError::MalformedArchive {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Result type alias for doct_io operations.
pub type Result<T> = std::result::Result<T, ShapeIoError>;

/// Open `path` for reading, mapping failure to `MissingFile`.
pub(crate) fn open_file(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| ShapeIoError::MissingFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Create `path` for writing.
pub(crate) fn create_file(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).map_err(|e| ShapeIoError::ArchiveWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
