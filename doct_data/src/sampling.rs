//! Random sampling kernels.
//!
//! All kernels draw with replacement and take the RNG explicitly, so a
//! seeded generator reproduces the same rows.

use doct_core::{Point3, PointSet, NORM_EPS};
use doct_io::SdfField;
use rand::Rng;

use crate::error::{DataError, Result};
use crate::sample::SdfSamples;

/// Signed distance assigned to off-surface samples.
pub const OFF_SURFACE_SDF: f32 = -1.0;

/// Draw `count` indices uniformly from `0..population`, with replacement.
///
/// Returns `None` when the population is empty.
pub fn draw_indices<R: Rng + ?Sized>(
    rng: &mut R,
    population: usize,
    count: usize,
) -> Option<Vec<usize>> {
    if population == 0 {
        return None;
    }
    Some((0..count).map(|_| rng.random_range(0..population)).collect())
}

/// Scale a record position into the unit cube, optionally clamping.
#[inline]
fn to_unit_cube(p: Point3, scale: f32, clip: bool) -> Point3 {
    let p = p / scale;
    if clip {
        p.clamp(-1.0, 1.0)
    } else {
        p
    }
}

/// Gather `count` random rows of an SDF field.
///
/// Positions are divided by `scale`; `sdf` and `grad` are copied verbatim.
pub fn sample_sdf_field<R: Rng + ?Sized>(
    rng: &mut R,
    field: &SdfField,
    scale: f32,
    clip: bool,
    count: usize,
) -> Result<SdfSamples> {
    let idx = draw_indices(rng, field.len(), count).ok_or(DataError::EmptyField { field: "sdf" })?;
    SdfSamples::new(
        idx.iter()
            .map(|&i| to_unit_cube(field.points[i], scale, clip))
            .collect(),
        idx.iter().map(|&i| field.sdf[i]).collect(),
        idx.iter().map(|&i| field.grad[i]).collect(),
    )
}

/// Draw `count` surface samples: sdf `0`, gradient equal to the normal.
pub fn sample_on_surface<R: Rng + ?Sized>(
    rng: &mut R,
    points: &PointSet,
    count: usize,
) -> Result<SdfSamples> {
    let idx = draw_indices(rng, points.len(), count)
        .ok_or(DataError::EmptyField { field: "points" })?;
    SdfSamples::new(
        idx.iter().map(|&i| points.points()[i]).collect(),
        vec![0.0; count],
        idx.iter().map(|&i| points.normals()[i]).collect(),
    )
}

/// Draw `count` off-surface samples from raw positions.
///
/// Positions are divided by `scale`. The sdf is the [`OFF_SURFACE_SDF`]
/// sentinel and the gradient is the normalized position, an approximation
/// rather than ground truth.
pub fn sample_off_surface<R: Rng + ?Sized>(
    rng: &mut R,
    xyz: &[Point3],
    scale: f32,
    clip: bool,
    count: usize,
) -> Result<SdfSamples> {
    let idx =
        draw_indices(rng, xyz.len(), count).ok_or(DataError::EmptyField { field: "sdf.points" })?;
    let pos: Vec<Point3> = idx
        .iter()
        .map(|&i| to_unit_cube(xyz[i], scale, clip))
        .collect();
    let grad = pos.iter().map(|p| p.normalize_or_eps(NORM_EPS)).collect();
    SdfSamples::new(pos, vec![OFF_SURFACE_SDF; count], grad)
}

/// Concatenate two sample sets, `first` rows before `second`.
pub fn concat_samples(first: SdfSamples, second: SdfSamples) -> SdfSamples {
    let mut out = first;
    out.extend(second);
    out
}
