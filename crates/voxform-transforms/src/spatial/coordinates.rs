use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxform_core::image::index::{numel, unravel};
use voxform_core::{ArrayKind, ImageArray, Result, TransformError};

/// Append coordinate channels for selected spatial axes.
///
/// Each appended channel holds `linspace(-0.5, 0.5, n)` along its axis,
/// broadcast over the others. Axes are counted from 1 so that 0 would name
/// the channel axis, which is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCoordinateChannels {
    spatial_channels: Vec<usize>,
}

impl AddCoordinateChannels {
    pub fn new(spatial_channels: Vec<usize>) -> Self {
        Self { spatial_channels }
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<ImageArray<B>> {
        let shape = image.spatial_shape().to_vec();
        if self.spatial_channels.contains(&0) {
            return Err(TransformError::invalid_configuration(
                "coordinate channels are 1-based, 0 is the channel axis",
            ));
        }
        if let Some(&axis) = self.spatial_channels.iter().find(|&&a| a > shape.len()) {
            return Err(TransformError::dimension_mismatch(format!(
                "coordinate channel {} exceeds {} spatial axes",
                axis,
                shape.len()
            )));
        }

        let total = numel(&shape);
        let mut values = Vec::with_capacity(self.spatial_channels.len() * total);
        let mut index = vec![0usize; shape.len()];
        for &channel in &self.spatial_channels {
            let axis = channel - 1;
            let n = shape[axis];
            for flat in 0..total {
                unravel(flat, &shape, &mut index);
                let v = if n > 1 {
                    -0.5 + index[axis] as f64 / (n - 1) as f64
                } else {
                    -0.5
                };
                values.push(v as f32);
            }
        }
        let mut coord_shape = vec![self.spatial_channels.len()];
        coord_shape.extend_from_slice(&shape);
        let coords = ImageArray::from_floats(values, coord_shape, &image.device())?;
        ImageArray::concat_channels(vec![image.to_float(), coords])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_appends_selected_axes() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 2, 3], &Default::default()).unwrap();
        let out = AddCoordinateChannels::new(vec![2, 1]).apply(&image).unwrap();
        assert_eq!(out.shape(), &[3, 2, 3]);
        let values = out.to_vec_f32().unwrap();
        assert_eq!(&values[6..12], &[-0.5, 0.0, 0.5, -0.5, 0.0, 0.5]);
        assert_eq!(&values[12..18], &[-0.5, -0.5, -0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_rejects_channel_axis_and_out_of_range() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 2, 3], &Default::default()).unwrap();
        assert!(AddCoordinateChannels::new(vec![0]).apply(&image).is_err());
        assert!(AddCoordinateChannels::new(vec![3]).apply(&image).is_err());
    }
}
