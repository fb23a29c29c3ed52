//! Per-shape loading and sampling configuration.

use burn::config::Config;
use doct_core::check_depths;

/// Which payloads to load and how to turn them into a training sample.
///
/// Every `load_*` flag gates exactly one field of the raw record.
#[derive(Config, Debug)]
pub struct ShapeConfig {
    /// Maximum octree depth.
    #[config(default = 6)]
    pub depth: usize,

    /// Depth down to which the octree is fully subdivided.
    #[config(default = 2)]
    pub full_depth: usize,

    /// Number of SDF samples drawn per shape (per half with surface synthesis).
    #[config(default = 5000)]
    pub point_sample_num: usize,

    /// Divisor mapping record coordinates into `[-1, 1]`.
    #[config(default = 0.5)]
    pub point_scale: f32,

    /// Load the serialized input octree.
    #[config(default = false)]
    pub load_octree: bool,

    /// Load and normalize the surface point cloud.
    #[config(default = true)]
    pub load_pointcloud: bool,

    /// Load per-point colors alongside the point cloud.
    #[config(default = false)]
    pub load_color: bool,

    /// Load the small split indicators.
    #[config(default = false)]
    pub load_split_small: bool,

    /// Load the large split indicators.
    #[config(default = false)]
    pub load_split_large: bool,

    /// Load occupancy samples.
    #[config(default = false)]
    pub load_occu: bool,

    /// Load and subsample the SDF field.
    #[config(default = true)]
    pub load_sdf: bool,

    /// Replace SDF samples with on-surface and off-surface samples.
    #[config(default = false)]
    pub sample_surf_points: bool,

    /// Clamp SDF and off-surface positions to `[-1, 1]` after scaling.
    #[config(default = false)]
    pub clip_sdf_points: bool,

    /// Skip an unloadable split_large with a warning instead of failing.
    #[config(default = false)]
    pub lenient_split_large: bool,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeConfig {
    /// Octree depth pair as `(depth, full_depth)`.
    pub fn octree_depths(&self) -> (u32, u32) {
        (
            u32::try_from(self.depth).unwrap_or(u32::MAX),
            u32::try_from(self.full_depth).unwrap_or(u32::MAX),
        )
    }

    /// Number of rows in the final `sdf` samples.
    pub fn samples_per_shape(&self) -> usize {
        if self.sample_surf_points {
            2 * self.point_sample_num
        } else {
            self.point_sample_num
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.point_scale.is_finite() && self.point_scale > 0.0) {
            return Err(format!(
                "point_scale must be positive and finite, got {}",
                self.point_scale
            ));
        }
        if self.point_sample_num == 0 {
            return Err("point_sample_num must be positive".to_string());
        }
        let (depth, full_depth) = self.octree_depths();
        check_depths(depth, full_depth).map_err(|e| e.to_string())?;
        if self.load_color && !self.load_pointcloud {
            return Err("load_color requires load_pointcloud".to_string());
        }
        if self.sample_surf_points && !self.load_pointcloud {
            return Err("sample_surf_points requires load_pointcloud for on-surface points".to_string());
        }
        if self.sample_surf_points && !self.load_sdf {
            return Err("sample_surf_points requires load_sdf for off-surface points".to_string());
        }
        Ok(())
    }
}
