//! Oriented point sets with optional per-point features.

use crate::error::{CoreError, Result};
use crate::types::Point3;

/// Dense per-point features (e.g. colors), row-major `N x channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeatures {
    channels: usize,
    values: Vec<f32>,
}

impl PointFeatures {
    /// Wrap a row-major buffer.
    ///
    /// Fails if `values.len()` is not a multiple of `channels`.
    pub fn new(channels: usize, values: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            if !values.is_empty() {
                return Err(CoreError::LengthMismatch {
                    what: "features",
                    expected: 0,
                    got: values.len(),
                });
            }
        } else if values.len() % channels != 0 {
            return Err(CoreError::LengthMismatch {
                what: "features",
                expected: values.len() - values.len() % channels,
                got: values.len(),
            });
        }
        Ok(Self { channels, values })
    }

    /// Number of channels per point.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.values.len() / self.channels
        }
    }

    /// Feature row for point `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.channels..(i + 1) * self.channels]
    }

    /// Flat row-major values.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Consume into the flat buffer.
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// An unordered set of oriented points.
///
/// `points` and `normals` (and `features`, when present) are index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<Point3>,
    normals: Vec<Point3>,
    features: Option<PointFeatures>,
}

impl PointSet {
    /// Create a point set from aligned positions and normals.
    pub fn new(points: Vec<Point3>, normals: Vec<Point3>) -> Result<Self> {
        if points.len() != normals.len() {
            return Err(CoreError::LengthMismatch {
                what: "normals",
                expected: points.len(),
                got: normals.len(),
            });
        }
        Ok(Self {
            points,
            normals,
            features: None,
        })
    }

    /// Attach per-point features.
    pub fn with_features(mut self, features: PointFeatures) -> Result<Self> {
        if features.rows() != self.points.len() {
            return Err(CoreError::LengthMismatch {
                what: "features",
                expected: self.points.len(),
                got: features.rows(),
            });
        }
        self.features = Some(features);
        Ok(self)
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the set holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point positions.
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Point normals.
    #[inline]
    pub fn normals(&self) -> &[Point3] {
        &self.normals
    }

    /// Per-point features, if any.
    #[inline]
    pub fn features(&self) -> Option<&PointFeatures> {
        self.features.as_ref()
    }

    /// Divide every position by `divisor`.
    pub fn scale_down(&mut self, divisor: f32) {
        for p in &mut self.points {
            *p = *p / divisor;
        }
    }

    /// Normalize every normal as `n / (|n| + eps)`.
    pub fn normalize_normals(&mut self, eps: f32) {
        for n in &mut self.normals {
            *n = n.normalize_or_eps(eps);
        }
    }

    /// Hard-clamp every coordinate to `[min, max]`.
    ///
    /// Points outside the range are moved onto its boundary, not removed.
    pub fn clamp(&mut self, min: f32, max: f32) {
        for p in &mut self.points {
            *p = p.clamp(min, max);
        }
    }

    /// True if every coordinate lies in `[min, max]`.
    pub fn in_range(&self, min: f32, max: f32) -> bool {
        self.points.iter().all(|p| p.in_range(min, max))
    }

    /// Axis-aligned bounding box, or `None` if empty.
    pub fn bounding_box(&self) -> Option<(Point3, Point3)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }
}
