//! Nearest neighbor interpolation implementation.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;
use crate::image::index::strides;

/// Nearest Neighbor Interpolator.
///
/// Rounds each coordinate to the nearest integer, ties to even.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(
        &self,
        data: &Tensor<B, 2>,
        shape: &[usize],
        indices: &[Tensor<B, 1>],
        zero_outside: bool,
    ) -> Tensor<B, 2> {
        let strides = strides(shape);
        let device = data.device();
        let points = indices[0].dims()[0];

        let mut flat = Tensor::<B, 1, Int>::zeros([points], &device);
        let mut inside = Tensor::<B, 1>::ones([points], &device);
        for (axis, x) in indices.iter().enumerate() {
            let max = (shape[axis] - 1) as f64;
            let rounded = x.clone().round();
            if zero_outside {
                inside = inside
                    * rounded.clone().greater_equal_elem(0.0).float()
                    * rounded.clone().lower_equal_elem(max).float();
            }
            let idx = rounded.clamp(0.0, max).int();
            flat = flat + idx.mul_scalar(strides[axis] as i64);
        }

        let values = data.clone().select(1, flat);
        if zero_outside {
            values * inside.reshape([1, points])
        } else {
            values
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_rounds_and_masks() {
        let device = Default::default();
        // Shape [Z=2, Y=2, X=2]
        let data = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0], [1, 8]),
            &device,
        );
        let z = Tensor::<TestBackend, 1>::from_floats([0.6, 0.2, 0.0], &device);
        let y = Tensor::<TestBackend, 1>::from_floats([0.4, 0.9, 0.0], &device);
        let x = Tensor::<TestBackend, 1>::from_floats([0.7, 0.1, 2.0], &device);

        let interpolator = NearestNeighborInterpolator::new();
        let result = interpolator.interpolate(&data, &[2, 2, 2], &[z, y, x], true);
        let result_data = result.into_data();
        let slice = result_data.as_slice::<f32>().unwrap();

        assert_eq!(slice[0], 101.0);
        assert_eq!(slice[1], 10.0);
        assert_eq!(slice[2], 0.0);
    }
}
