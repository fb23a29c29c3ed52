//! Reads the enabled payloads of a shape record.

use std::path::Path;
use std::sync::Arc;

use doct_io::{
    layout, load_octree_file, load_tensor_file, read_colors, read_occupancy, read_point_cloud,
    read_sdf_field,
};

use crate::config::ShapeConfig;
use crate::error::Result;
use crate::raw::{RawShape, SplitLoadFailure};

/// Loads raw shape records according to the `load_*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShapeLoader {
    load_octree: bool,
    load_pointcloud: bool,
    load_color: bool,
    load_split_small: bool,
    load_split_large: bool,
    load_occu: bool,
    load_sdf: bool,
}

impl ShapeLoader {
    /// Take the load flags from a shape configuration.
    pub fn new(config: &ShapeConfig) -> Self {
        Self {
            load_octree: config.load_octree,
            load_pointcloud: config.load_pointcloud,
            load_color: config.load_color,
            load_split_small: config.load_split_small,
            load_split_large: config.load_split_large,
            load_occu: config.load_occu,
            load_sdf: config.load_sdf,
        }
    }

    /// Load the record stored in directory `location`.
    ///
    /// Only enabled payloads are touched, so with every flag off this
    /// succeeds for any location. A failed `split_large` load is kept in
    /// the record instead of aborting.
    pub fn load<P: AsRef<Path>>(&self, location: P) -> Result<RawShape> {
        let location = location.as_ref();
        let mut raw = RawShape::default();

        if self.load_octree {
            let octree = load_octree_file(location.join(layout::OCTREE))?;
            raw.octree_in = Some(Arc::new(octree));
        }

        if self.load_pointcloud {
            let mut cloud = read_point_cloud(location.join(layout::POINT_CLOUD))?;
            if self.load_color {
                cloud.colors = Some(read_colors(location.join(layout::COLOR), cloud.len())?);
            }
            raw.point_cloud = Some(cloud);
        }

        if self.load_split_small {
            raw.split_small = Some(load_tensor_file(location.join(layout::SPLIT_SMALL))?);
        }

        if self.load_split_large {
            let path = location.join(layout::SPLIT_LARGE);
            let loaded = load_tensor_file(&path).map_err(|e| {
                log::warn!(
                    "failed to load split_large for {}: {}",
                    location.display(),
                    e
                );
                SplitLoadFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            });
            raw.split_large = Some(loaded);
        }

        if self.load_occu {
            raw.occu = Some(read_occupancy(location.join(layout::OCCUPANCY))?);
        }

        if self.load_sdf {
            raw.sdf = Some(read_sdf_field(location.join(layout::SDF))?);
        }

        Ok(raw)
    }
}
