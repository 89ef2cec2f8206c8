use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxform_core::interpolation::interpolate;
use voxform_core::{ArrayKind, ImageArray, InterpolateMode, Result, TransformError};

/// How a [`Resize`] target is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// One target per spatial axis.
    #[default]
    All,
    /// A single target for the longest axis, scaling the others to keep the
    /// aspect ratio.
    Longest,
}

/// Resize an image by interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resize {
    spatial_size: Vec<i64>,
    size_mode: SizeMode,
    mode: InterpolateMode,
    align_corners: Option<bool>,
}

impl Resize {
    /// Resize every spatial axis.
    ///
    /// Non-positive entries keep the input size of that axis. Extra entries
    /// add trailing axes of size one before resizing.
    pub fn new(spatial_size: Vec<i64>) -> Self {
        Self {
            spatial_size,
            size_mode: SizeMode::All,
            mode: InterpolateMode::Area,
            align_corners: None,
        }
    }

    /// Resize so the longest spatial axis becomes `size`.
    pub fn longest(size: i64) -> Self {
        Self {
            size_mode: SizeMode::Longest,
            ..Self::new(vec![size])
        }
    }

    pub fn with_size_mode(mut self, size_mode: SizeMode) -> Self {
        self.size_mode = size_mode;
        self
    }

    pub fn with_mode(mut self, mode: InterpolateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_align_corners(mut self, align_corners: Option<bool>) -> Self {
        self.align_corners = align_corners;
        self
    }

    /// Output spatial size for an input spatial size.
    pub fn output_size(&self, input: &[usize]) -> Result<Vec<usize>> {
        match self.size_mode {
            SizeMode::All => {
                if self.spatial_size.len() < input.len() {
                    return Err(TransformError::dimension_mismatch(format!(
                        "spatial size has {} entries, the image has {} spatial axes",
                        self.spatial_size.len(),
                        input.len()
                    )));
                }
                Ok(self
                    .spatial_size
                    .iter()
                    .enumerate()
                    .map(|(axis, &s)| {
                        let current = input.get(axis).copied().unwrap_or(1);
                        if s > 0 {
                            s as usize
                        } else {
                            current
                        }
                    })
                    .collect())
            }
            SizeMode::Longest => {
                let &[target] = self.spatial_size.as_slice() else {
                    return Err(TransformError::invalid_configuration(format!(
                        "longest mode takes a single size, got {:?}",
                        self.spatial_size
                    )));
                };
                if target <= 0 {
                    return Err(TransformError::invalid_configuration(format!(
                        "longest mode needs a positive size, got {}",
                        target
                    )));
                }
                let longest = input.iter().copied().max().unwrap_or(1).max(1);
                let scale = target as f64 / longest as f64;
                Ok(input
                    .iter()
                    .map(|&n| ((n as f64 * scale).round_ties_even() as usize).max(1))
                    .collect())
            }
        }
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<ImageArray<B>> {
        let size = self.output_size(image.spatial_shape())?;
        let mut image = image.to_float();
        if size.len() > image.spatial_rank() {
            let mut shape = image.shape().to_vec();
            shape.resize(size.len() + 1, 1);
            image = image.reshape(shape)?;
        }
        if image.spatial_shape() == size.as_slice() {
            return Ok(image);
        }
        interpolate(&image, &size, self.mode, self.align_corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn ones(shape: Vec<usize>) -> ImageArray<TestBackend> {
        let n = shape.iter().product::<usize>();
        ImageArray::from_floats(vec![1.0; n], shape, &Default::default()).unwrap()
    }

    #[test]
    fn test_fall_back_on_non_positive() {
        let out = Resize::new(vec![32, -1]).apply(&ones(vec![1, 16, 64])).unwrap();
        assert_eq!(out.shape(), &[1, 32, 64]);
    }

    #[test]
    fn test_extra_axes_are_appended() {
        let out = Resize::new(vec![4, 4, 2]).apply(&ones(vec![2, 4, 4])).unwrap();
        assert_eq!(out.shape(), &[2, 4, 4, 2]);
        assert!(out.to_vec_f32().unwrap().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_fewer_entries_rejected() {
        assert!(Resize::new(vec![8]).apply(&ones(vec![1, 4, 4])).is_err());
    }

    #[test]
    fn test_longest_keeps_aspect() {
        let resize = Resize::longest(8);
        assert_eq!(resize.output_size(&[16, 4]).unwrap(), vec![8, 2]);
        // 5 * 0.5 = 2.5 and 3 * 0.5 = 1.5 round half to even.
        let half = Resize::longest(5);
        assert_eq!(half.output_size(&[10, 5, 3]).unwrap(), vec![5, 2, 2]);
        let several = Resize::new(vec![4, 4]).with_size_mode(SizeMode::Longest);
        assert!(several.output_size(&[4, 4]).is_err());
    }

    #[test]
    fn test_area_downsample_averages() {
        let image = ImageArray::<TestBackend>::from_floats(vec![1.0, 3.0, 5.0, 7.0], vec![1, 4], &Default::default())
            .unwrap();
        let out = Resize::new(vec![2]).apply(&image).unwrap();
        assert_eq!(out.to_vec_f32().unwrap(), vec![2.0, 6.0]);
    }
}
