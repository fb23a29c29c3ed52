//! Training samples and their tensor forms.

use std::sync::Arc;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use doct_core::{CoreError, Octree, Point3, PointSet};
use doct_io::SplitTensor;

use crate::error::{DataError, Result};

/// Supervision rows: position, signed distance and gradient.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SdfSamples {
    pos: Vec<Point3>,
    sdf: Vec<f32>,
    grad: Vec<Point3>,
}

impl SdfSamples {
    /// Assemble samples from aligned columns.
    pub fn new(pos: Vec<Point3>, sdf: Vec<f32>, grad: Vec<Point3>) -> Result<Self> {
        for (what, got) in [("sdf", sdf.len()), ("grad", grad.len())] {
            if got != pos.len() {
                return Err(CoreError::LengthMismatch {
                    what,
                    expected: pos.len(),
                    got,
                }
                .into());
            }
        }
        Ok(Self { pos, sdf, grad })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.pos.len()
    }

    /// True if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }

    /// Sample positions.
    pub fn pos(&self) -> &[Point3] {
        &self.pos
    }

    /// Signed distances.
    pub fn sdf(&self) -> &[f32] {
        &self.sdf
    }

    /// Gradients.
    pub fn grad(&self) -> &[Point3] {
        &self.grad
    }

    /// Append the rows of `other` after these.
    pub fn extend(&mut self, other: SdfSamples) {
        self.pos.extend(other.pos);
        self.sdf.extend(other.sdf);
        self.grad.extend(other.grad);
    }

    /// Convert to tensors on `device`.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> SdfSampleTensors<B> {
        let n = self.len();
        SdfSampleTensors {
            pos: points_tensor(&self.pos, device),
            sdf: Tensor::from_data(TensorData::new(self.sdf.clone(), [n]), device),
            grad: points_tensor(&self.grad, device),
        }
    }
}

/// Tensor form of [`SdfSamples`].
#[derive(Debug, Clone)]
pub struct SdfSampleTensors<B: Backend> {
    /// Positions, `[N, 3]`.
    pub pos: Tensor<B, 2>,
    /// Signed distances, `[N]`.
    pub sdf: Tensor<B, 1>,
    /// Gradients, `[N, 3]`.
    pub grad: Tensor<B, 2>,
}

/// `[N, 3]` tensor from a slice of points.
pub fn points_tensor<B: Backend>(points: &[Point3], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = points.iter().flat_map(|p| p.as_array()).collect();
    Tensor::from_data(TensorData::new(flat, [points.len(), 3]), device)
}

/// Conversion of split indicators into burn tensors.
pub trait SplitTensorExt {
    /// Convert to a rank-`D` tensor, failing if the stored rank differs.
    fn to_tensor<B: Backend, const D: usize>(&self, device: &B::Device) -> Result<Tensor<B, D>>;
}

impl SplitTensorExt for SplitTensor {
    fn to_tensor<B: Backend, const D: usize>(&self, device: &B::Device) -> Result<Tensor<B, D>> {
        if self.rank() != D {
            return Err(DataError::RankMismatch {
                expected: D,
                got: self.shape().to_vec(),
            });
        }
        let data = TensorData::new(self.values().to_vec(), self.shape().to_vec());
        Ok(Tensor::from_data(data, device))
    }
}

/// One transformed shape, ready for batching.
///
/// The schema is fixed: a field is `Some` iff the step producing it ran.
#[derive(Debug, Clone, Default)]
pub struct TrainingSample {
    /// Position of the shape in its dataset.
    pub index: usize,
    /// Input octree, shared with the raw record.
    pub octree_in: Option<Arc<Octree>>,
    /// Normalized surface points.
    pub points: Option<PointSet>,
    /// Small split indicators.
    pub split_small: Option<SplitTensor>,
    /// Large split indicators.
    pub split_large: Option<SplitTensor>,
    /// SDF supervision.
    pub sdf: Option<SdfSamples>,
}

impl TrainingSample {
    /// Names of the present fields.
    pub fn keys(&self) -> Vec<&'static str> {
        [
            ("octree_in", self.octree_in.is_some()),
            ("points", self.points.is_some()),
            ("split_small", self.split_small.is_some()),
            ("split_large", self.split_large.is_some()),
            ("sdf", self.sdf.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_samples_alignment() {
        assert!(SdfSamples::new(vec![Point3::ZERO; 2], vec![0.0; 2], vec![Point3::ZERO; 2]).is_ok());
        let err = SdfSamples::new(vec![Point3::ZERO; 2], vec![0.0; 1], vec![Point3::ZERO; 2]);
        assert!(matches!(err, Err(DataError::Core(_))));
    }

    #[test]
    fn test_to_tensors_shapes() {
        let device = Default::default();
        let samples = SdfSamples::new(
            vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)],
            vec![0.0, -1.0],
            vec![Point3::new(0.0, 0.0, 1.0); 2],
        )
        .unwrap();

        let tensors = samples.to_tensors::<TestBackend>(&device);
        assert_eq!(tensors.pos.dims(), [2, 3]);
        assert_eq!(tensors.sdf.dims(), [2]);
        assert_eq!(tensors.grad.dims(), [2, 3]);

        let pos: Vec<f32> = tensors.pos.into_data().to_vec().unwrap();
        assert_eq!(pos, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_split_to_tensor_checks_rank() {
        let device = Default::default();
        let split = SplitTensor::new(vec![2, 4], vec![1.0; 8]).unwrap();

        let tensor = split.to_tensor::<TestBackend, 2>(&device).unwrap();
        assert_eq!(tensor.dims(), [2, 4]);

        let err = split.to_tensor::<TestBackend, 1>(&device).unwrap_err();
        assert!(matches!(err, DataError::RankMismatch { expected: 1, .. }));
    }
}
