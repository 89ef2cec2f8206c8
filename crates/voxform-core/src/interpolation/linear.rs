//! Linear interpolation implementation.
//!
//! This module provides N-linear interpolation (bilinear for 2D, trilinear for
//! 3D) for any spatial rank.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;
use crate::image::index::strides;

/// Linear Interpolator.
///
/// Blends the `2^D` voxels surrounding each sample point.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(
        &self,
        data: &Tensor<B, 2>,
        shape: &[usize],
        indices: &[Tensor<B, 1>],
        zero_outside: bool,
    ) -> Tensor<B, 2> {
        let rank = shape.len();
        let strides = strides(shape);
        let device = data.device();
        let channels = data.dims()[0];
        let points = indices[0].dims()[0];

        let lower: Vec<Tensor<B, 1>> = indices.iter().map(|x| x.clone().floor()).collect();
        let frac: Vec<Tensor<B, 1>> = indices
            .iter()
            .zip(&lower)
            .map(|(x, x0)| x.clone() - x0.clone())
            .collect();

        let mut output = Tensor::<B, 2>::zeros([channels, points], &device);
        for corner in 0..(1usize << rank) {
            let mut weight = Tensor::<B, 1>::ones([points], &device);
            let mut flat = Tensor::<B, 1, Int>::zeros([points], &device);

            for axis in 0..rank {
                let upper = (corner >> axis) & 1 == 1;
                let max = (shape[axis] - 1) as f64;
                let (position, mut w) = if upper {
                    (lower[axis].clone().add_scalar(1.0), frac[axis].clone())
                } else {
                    (lower[axis].clone(), frac[axis].clone().neg().add_scalar(1.0))
                };
                if zero_outside {
                    let inside = position.clone().greater_equal_elem(0.0).float()
                        * position.clone().lower_equal_elem(max).float();
                    w = w * inside;
                }
                weight = weight * w;
                let idx = position.clamp(0.0, max).int();
                flat = flat + idx.mul_scalar(strides[axis] as i64);
            }

            let values = data.clone().select(1, flat);
            output = output + values * weight.reshape([1, points]);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn square() -> Tensor<TestBackend, 2> {
        // Shape [Y=2, X=2]: (0,0)=0, (0,1)=1, (1,0)=10, (1,1)=11
        Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 1.0, 10.0, 11.0], [1, 4]),
            &Default::default(),
        )
    }

    fn coords(values: &[f32]) -> Tensor<TestBackend, 1> {
        Tensor::<TestBackend, 1>::from_data(
            TensorData::new(values.to_vec(), [values.len()]),
            &Default::default(),
        )
    }

    #[test]
    fn test_linear_exact_and_centre() {
        let interpolator = LinearInterpolator::new();
        let ys = coords(&[0.0, 1.0, 0.5]);
        let xs = coords(&[1.0, 0.0, 0.5]);

        let result = interpolator.interpolate(&square(), &[2, 2], &[ys, xs], false);
        let result_data = result.into_data();
        let slice = result_data.as_slice::<f32>().unwrap();

        assert_eq!(slice[0], 1.0);
        assert_eq!(slice[1], 10.0);
        assert!((slice[2] - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_linear_zero_outside() {
        let interpolator = LinearInterpolator::new();
        let ys = coords(&[-1.0, -0.5]);
        let xs = coords(&[0.0, 1.0]);

        let result = interpolator.interpolate(&square(), &[2, 2], &[ys, xs], true);
        let result_data = result.into_data();
        let slice = result_data.as_slice::<f32>().unwrap();

        assert_eq!(slice[0], 0.0);
        // Half of the weight lands on row 0, the other half outside.
        assert!((slice[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_linear_1d() {
        let interpolator = LinearInterpolator::new();
        let data = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![2.0f32, 4.0, 8.0], [1, 3]),
            &Default::default(),
        );
        let result = interpolator.interpolate(&data, &[3], &[coords(&[1.25])], false);
        let result_data = result.into_data();
        let slice = result_data.as_slice::<f32>().unwrap();
        assert!((slice[0] - 5.0).abs() < 1e-6);
    }
}
