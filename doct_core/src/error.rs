//! Error types for doct_core operations.
//!
//! A plain enum with a hand-written `Display`; the crate has no dependencies.

use std::fmt;

/// Errors that can occur while building or validating geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Two index-aligned arrays have different lengths.
    LengthMismatch {
        /// Name of the array that disagrees.
        what: &'static str,
        /// Expected number of rows.
        expected: usize,
        /// Actual number of rows.
        got: usize,
    },
    /// Octree depth pair violates `full_depth <= depth <= max` or `full_depth <= max_full`.
    InvalidDepth {
        /// Requested maximum depth.
        depth: u32,
        /// Requested full depth.
        full_depth: u32,
        /// Largest supported depth.
        max: u32,
        /// Largest supported full depth.
        max_full: u32,
    },
    /// Octree parts do not describe a consistent octree.
    InvalidOctree {
        /// Description of the inconsistency.
        message: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::LengthMismatch {
                what,
                expected,
                got,
            } => {
                write!(f, "{} has {} rows, expected {}", what, got, expected)
            }
            CoreError::InvalidDepth {
                depth,
                full_depth,
                max,
                max_full,
            } => {
                write!(
                    f,
                    "invalid octree depth: depth={} full_depth={} (require full_depth <= depth <= {}, full_depth <= {})",
                    depth, full_depth, max, max_full
                )
            }
            CoreError::InvalidOctree { message } => write!(f, "invalid octree: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type alias for doct_core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
