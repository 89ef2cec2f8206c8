//! Grid resampling filter.
//!
//! This module provides `Resampler`, which samples an image at the locations
//! held in a homogeneous coordinate grid.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::image::{ArrayKind, Grid, ImageArray};
use crate::interpolation::{grid_sample, normalize_coordinates, GridSampleMode, GridSamplePadMode};

/// Grid resampler.
///
/// Each output voxel takes the value of the input at the voxel-index
/// coordinate stored in the matching grid location. The grid's homogeneous
/// channel divides the coordinate channels before sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resampler {
    mode: GridSampleMode,
    padding_mode: GridSamplePadMode,
    align_corners: bool,
}

impl Default for Resampler {
    fn default() -> Self {
        Self {
            mode: GridSampleMode::Bilinear,
            padding_mode: GridSamplePadMode::Border,
            align_corners: true,
        }
    }
}

impl Resampler {
    /// Create a resampler with bilinear sampling, border padding and aligned
    /// corners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpolation rule.
    pub fn with_mode(mut self, mode: GridSampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the boundary rule.
    pub fn with_padding_mode(mut self, padding_mode: GridSamplePadMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    /// Set the corner alignment used for normalization.
    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
        self
    }

    pub fn mode(&self) -> GridSampleMode {
        self.mode
    }

    pub fn padding_mode(&self) -> GridSamplePadMode {
        self.padding_mode
    }

    pub fn align_corners(&self) -> bool {
        self.align_corners
    }

    /// Resample `image` at the points of `grid`.
    ///
    /// # Arguments
    /// * `image` - Image `[C, *spatial_in]` of any kind; it is sampled as float
    /// * `grid` - Homogeneous grid `[D + 1, *spatial_out]`
    ///
    /// # Returns
    /// Float image `[C, *spatial_out]`
    ///
    /// # Errors
    /// `MissingInput` when no grid is given, `DimensionMismatch` when the
    /// grid rank differs from the image rank.
    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &self,
        image: &ImageArray<B, K>,
        grid: Option<&Grid<B>>,
    ) -> Result<ImageArray<B>> {
        let grid = grid.ok_or_else(|| TransformError::missing_input("resampling needs a grid"))?;
        let rank = image.spatial_rank();
        if grid.spatial_rank() != rank {
            return Err(TransformError::dimension_mismatch(format!(
                "grid with {} spatial axes cannot resample an image with {}",
                grid.spatial_rank(),
                rank
            )));
        }

        let coords = grid.coordinates();
        let points = grid.array().spatial_numel();
        let shape = image.spatial_shape();
        // Rows are reversed: the sampler expects the last array axis first.
        let rows: Vec<Tensor<B, 2>> = (0..rank)
            .rev()
            .map(|axis| {
                let row = coords.clone().slice([axis..axis + 1, 0..points]).reshape([points]);
                normalize_coordinates(row, shape[axis], self.align_corners).reshape([1, points])
            })
            .collect();
        let normalized = Tensor::cat(rows, 0);

        tracing::trace!(
            input = ?shape,
            output = ?grid.spatial_shape(),
            mode = %self.mode,
            padding = %self.padding_mode,
            "resampling"
        );
        grid_sample(
            &image.to_float(),
            &normalized,
            grid.spatial_shape(),
            self.mode,
            self.padding_mode,
            self.align_corners,
        )
    }
}
