use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxform_core::filter::{spatial_crop, spatial_pad};
use voxform_core::interpolation::interpolate;
use voxform_core::{ArrayKind, ImageArray, InterpolateMode, NumpyPadMode, Result};

use super::expand_to_rank;

/// Scale an image by per-axis zoom factors.
///
/// The zoomed size is `floor(n * zoom)`. With `keep_size` (default) the result
/// is padded or centre-cropped back to the input shape; an odd difference puts
/// the extra voxel on the trailing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zoom {
    zoom: Vec<f64>,
    mode: InterpolateMode,
    padding_mode: NumpyPadMode,
    align_corners: Option<bool>,
    keep_size: bool,
}

impl Zoom {
    /// Zoom by one factor per spatial axis, or one factor for all of them.
    pub fn new(zoom: Vec<f64>) -> Self {
        Self {
            zoom,
            mode: InterpolateMode::Area,
            padding_mode: NumpyPadMode::Edge,
            align_corners: None,
            keep_size: true,
        }
    }

    pub fn with_mode(mut self, mode: InterpolateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: NumpyPadMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    pub fn with_align_corners(mut self, align_corners: Option<bool>) -> Self {
        self.align_corners = align_corners;
        self
    }

    pub fn with_keep_size(mut self, keep_size: bool) -> Self {
        self.keep_size = keep_size;
        self
    }

    pub fn zoom(&self) -> &[f64] {
        &self.zoom
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<ImageArray<B>> {
        let input = image.spatial_shape().to_vec();
        let zoom = expand_to_rank(&self.zoom, input.len(), "zoom")?;
        let size: Vec<usize> = input
            .iter()
            .zip(&zoom)
            .map(|(&n, &z)| (n as f64 * z).floor() as usize)
            .collect();
        let zoomed = interpolate(&image.to_float(), &size, self.mode, self.align_corners)?;
        if !self.keep_size || size == input {
            return Ok(zoomed);
        }

        let mut pads = vec![(0usize, 0usize); input.len()];
        let mut start = vec![0usize; input.len()];
        for (axis, (&original, &current)) in input.iter().zip(&size).enumerate() {
            let half = original.abs_diff(current) / 2;
            if original > current {
                pads[axis] = (half, original - current - half);
            } else if original < current {
                start[axis] = half;
            }
        }
        let padded = spatial_pad(&zoomed, &pads, self.padding_mode)?;
        spatial_crop(&padded, &start, &input)
    }
}
