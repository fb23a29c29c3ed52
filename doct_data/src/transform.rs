//! Turns a raw shape record into a training sample.
//!
//! Steps run in a fixed order, each gated by its flag:
//! 1. pass the input octree through
//! 2. normalize the point cloud into `[-1, 1]^3`
//! 3. pass the split indicators through
//! 4. subsample the SDF field
//! 5. synthesize on/off-surface samples, replacing step 4

use doct_core::{Octree, Point3, PointSet, NORM_EPS};
use doct_io::{RawPointCloud, SdfField, SplitTensor};
use rand::Rng;

use crate::config::ShapeConfig;
use crate::error::{DataError, Result};
use crate::raw::{RawShape, SplitLoadFailure};
use crate::sample::{SdfSamples, TrainingSample};
use crate::sampling;

/// Per-shape transform driven by a [`ShapeConfig`].
#[derive(Debug, Clone)]
pub struct ShapeTransform {
    config: ShapeConfig,
}

impl ShapeTransform {
    /// Create a transform, validating the configuration.
    pub fn new(config: ShapeConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|message| DataError::InvalidConfig { message })?;
        if config.sample_surf_points && config.load_sdf {
            log::info!("sample_surf_points is set: surface samples replace SDF subsampling");
        }
        Ok(Self { config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ShapeConfig {
        &self.config
    }

    /// Scale a raw point cloud into the unit cube.
    ///
    /// Positions are divided by `point_scale`, normals normalized, colors
    /// attached as features, and every coordinate hard-clamped to `[-1, 1]`.
    pub fn process_point_cloud(&self, cloud: &RawPointCloud) -> Result<PointSet> {
        let mut points = PointSet::new(cloud.points.clone(), cloud.normals.clone())?;
        if let Some(colors) = &cloud.colors {
            points = points.with_features(colors.clone())?;
        }
        points.scale_down(self.config.point_scale);
        points.normalize_normals(NORM_EPS);
        points.clamp(-1.0, 1.0);
        Ok(points)
    }

    /// Build an octree at the configured depths.
    pub fn points_to_octree(&self, points: &PointSet) -> Result<Octree> {
        let (depth, full_depth) = self.config.octree_depths();
        Ok(Octree::build(points, depth, full_depth)?)
    }

    /// Subsample `point_sample_num` rows of an SDF field.
    pub fn sample_sdf<R: Rng + ?Sized>(&self, rng: &mut R, field: &SdfField) -> Result<SdfSamples> {
        sampling::sample_sdf_field(
            rng,
            field,
            self.config.point_scale,
            self.config.clip_sdf_points,
            self.config.point_sample_num,
        )
    }

    /// Draw `point_sample_num` on-surface samples.
    pub fn sample_on_surface<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        points: &PointSet,
    ) -> Result<SdfSamples> {
        sampling::sample_on_surface(rng, points, self.config.point_sample_num)
    }

    /// Draw `point_sample_num` off-surface samples from raw positions.
    pub fn sample_off_surface<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        xyz: &[Point3],
    ) -> Result<SdfSamples> {
        sampling::sample_off_surface(
            rng,
            xyz,
            self.config.point_scale,
            self.config.clip_sdf_points,
            self.config.point_sample_num,
        )
    }

    /// Transform one raw record.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        raw: &RawShape,
        index: usize,
        rng: &mut R,
    ) -> Result<TrainingSample> {
        let config = &self.config;
        let mut sample = TrainingSample {
            index,
            ..Default::default()
        };

        if config.load_octree {
            let octree = raw
                .octree_in
                .as_ref()
                .ok_or(DataError::MissingField { field: "octree_in" })?;
            sample.octree_in = Some(octree.clone());
        }

        if config.load_pointcloud {
            let cloud = raw
                .point_cloud
                .as_ref()
                .ok_or(DataError::MissingField { field: "point_cloud" })?;
            sample.points = Some(self.process_point_cloud(cloud)?);
        }

        if config.load_split_small {
            let split = raw
                .split_small
                .as_ref()
                .ok_or(DataError::MissingField { field: "split_small" })?;
            sample.split_small = Some(split.clone());
        }

        if config.load_split_large {
            let loaded = raw
                .split_large
                .as_ref()
                .ok_or(DataError::MissingField { field: "split_large" })?;
            sample.split_large = self.resolve_split_large(loaded, index)?;
        }

        if config.sample_surf_points {
            let points = sample
                .points
                .as_ref()
                .ok_or(DataError::MissingField { field: "points" })?;
            let field = raw
                .sdf
                .as_ref()
                .ok_or(DataError::MissingField { field: "sdf" })?;
            let on_surf = self.sample_on_surface(rng, points)?;
            let off_surf = self.sample_off_surface(rng, &field.points)?;
            sample.sdf = Some(sampling::concat_samples(on_surf, off_surf));
        } else if config.load_sdf {
            let field = raw
                .sdf
                .as_ref()
                .ok_or(DataError::MissingField { field: "sdf" })?;
            sample.sdf = Some(self.sample_sdf(rng, field)?);
        }

        log::debug!(
            "sample {}: fields {:?}, {} sdf rows",
            index,
            sample.keys(),
            sample.sdf.as_ref().map_or(0, SdfSamples::len)
        );
        Ok(sample)
    }

    fn resolve_split_large(
        &self,
        loaded: &std::result::Result<SplitTensor, SplitLoadFailure>,
        index: usize,
    ) -> Result<Option<SplitTensor>> {
        match loaded {
            Ok(split) => Ok(Some(split.clone())),
            Err(failure) if self.config.lenient_split_large => {
                log::warn!("sample {}: skipping split_large ({})", index, failure);
                Ok(None)
            }
            Err(failure) => Err(DataError::SplitUnavailable {
                path: failure.path.clone(),
                reason: failure.reason.clone(),
            }),
        }
    }
}
