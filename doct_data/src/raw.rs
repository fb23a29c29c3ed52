//! Raw shape records as read from disk.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use doct_core::Octree;
use doct_io::{OccupancyField, RawPointCloud, SdfField, SplitTensor};

/// Why `split_large` could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitLoadFailure {
    /// File that failed to load.
    pub path: PathBuf,
    /// Description of the failure.
    pub reason: String,
}

impl fmt::Display for SplitLoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Untransformed payloads of one shape record.
///
/// A field is `Some` iff the matching `load_*` flag was enabled.
#[derive(Debug, Clone, Default)]
pub struct RawShape {
    /// Deserialized input octree.
    pub octree_in: Option<Arc<Octree>>,
    /// Surface points, normals and optional colors.
    pub point_cloud: Option<RawPointCloud>,
    /// Small split indicators.
    pub split_small: Option<SplitTensor>,
    /// Large split indicators, or the reason they failed to load.
    pub split_large: Option<Result<SplitTensor, SplitLoadFailure>>,
    /// Occupancy samples.
    pub occu: Option<OccupancyField>,
    /// Signed distance samples.
    pub sdf: Option<SdfField>,
}

impl RawShape {
    /// Names of the present fields, in record order.
    pub fn keys(&self) -> Vec<&'static str> {
        [
            ("octree_in", self.octree_in.is_some()),
            ("point_cloud", self.point_cloud.is_some()),
            ("split_small", self.split_small.is_some()),
            ("split_large", self.split_large.is_some()),
            ("occu", self.occu.is_some()),
            ("sdf", self.sdf.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }

    /// True if no field was loaded.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}
