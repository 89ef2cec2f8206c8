use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::Tensor;

use crate::error::{Result, TransformError};
use crate::image::ImageArray;

/// Gaussian smoothing filter.
///
/// Applies a Gaussian smoothing filter to every spatial axis of a
/// channel-first array using separable 1D convolutions. Sigmas are given in
/// voxels; samples beyond the border count as zero.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    sigmas: Vec<f64>,
    truncated: f64,
}

impl GaussianFilter {
    /// Create a new Gaussian filter.
    ///
    /// # Arguments
    /// * `sigmas` - Standard deviation per spatial axis in voxels. A single
    ///   value applies to every axis.
    pub fn new(sigmas: Vec<f64>) -> Self {
        Self {
            sigmas,
            truncated: 3.0,
        }
    }

    /// Set the kernel half-width in multiples of sigma.
    pub fn with_truncated(mut self, truncated: f64) -> Self {
        self.truncated = truncated;
        self
    }

    /// Apply the filter to every channel of `image`.
    ///
    /// # Errors
    /// `DimensionMismatch` when more than one sigma is given and the count
    /// differs from the spatial rank.
    pub fn apply<B: Backend>(&self, image: &ImageArray<B>) -> Result<ImageArray<B>> {
        let rank = image.spatial_rank();
        if self.sigmas.len() != 1 && self.sigmas.len() != rank {
            return Err(TransformError::dimension_mismatch(format!(
                "{} sigmas given for {} spatial axes",
                self.sigmas.len(),
                rank
            )));
        }

        let mut data = image.tensor().clone();
        let device = image.device();
        for axis in 0..rank {
            let sigma = if self.sigmas.len() == 1 { self.sigmas[0] } else { self.sigmas[axis] };
            // Skip if sigma is close to zero
            if sigma <= 1e-6 {
                continue;
            }
            let kernel = self.generate_kernel(sigma);
            let kernel_tensor = Tensor::<B, 1>::from_floats(kernel.as_slice(), &device);
            data = convolve_axis(data, image.shape(), axis + 1, kernel_tensor);
        }
        ImageArray::new(data, image.shape().to_vec())
    }

    fn generate_kernel(&self, sigma: f64) -> Vec<f32> {
        let radius = ((self.truncated * sigma).max(0.5) + 0.5) as i64;
        let two_sigma2 = 2.0 * sigma * sigma;
        let raw: Vec<f64> = (-radius..=radius)
            .map(|x| (-((x * x) as f64) / two_sigma2).exp())
            .collect();
        let sum: f64 = raw.iter().sum();
        raw.iter().map(|v| (v / sum) as f32).collect()
    }
}

/// Convolve a flat row-major tensor of `shape` along dimension `dim`.
fn convolve_axis<B: Backend>(
    input: Tensor<B, 1>,
    shape: &[usize],
    dim: usize,
    kernel: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let outer: usize = shape[..dim].iter().product();
    let length = shape[dim];
    let inner: usize = shape[dim + 1..].iter().product();
    let total = outer * length * inner;

    // [outer, length, inner] -> [outer * inner, 1, length]
    let batched = input
        .reshape([outer, length, inner])
        .swap_dims(1, 2)
        .reshape([outer * inner, 1, length]);

    let kernel_size = kernel.dims()[0];
    let kernel = kernel.reshape([1, 1, kernel_size]);
    let options = ConvOptions::new([1], [kernel_size / 2], [1], 1);
    let output = burn::tensor::module::conv1d(batched, kernel, None, options);

    output
        .reshape([outer, inner, length])
        .swap_dims(1, 2)
        .reshape([total])
}
