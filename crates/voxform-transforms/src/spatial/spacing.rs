//! Resampling to a new voxel spacing.

use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;
use voxform_core::spatial::{allclose, compute_shape_offset, embed_affine, to_affine_nd, zoom_affine};
use voxform_core::{
    ArrayKind, Grid, GridSampleMode, GridSamplePadMode, ImageArray, Resampler, Result, TransformError,
};

use super::AffineOutput;

/// Tolerance under which the voxel-to-voxel transform counts as identity.
const IDENTITY_ATOL: f64 = 1e-3;

/// Resample an image to the voxel spacing `pixdim`.
///
/// The voxel-to-world affine of the input defines its current spacing. The
/// output affine keeps the input rotation, axis polarity and origin (or
/// becomes `diag(pixdim, 1)` with `diagonal`), and the output shape covers
/// the same world extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pixdim: Vec<f64>,
    diagonal: bool,
    mode: GridSampleMode,
    padding_mode: GridSamplePadMode,
    align_corners: bool,
}

impl Spacing {
    /// Create a spacing operator.
    ///
    /// # Arguments
    /// * `pixdim` - Target spacing per spatial axis. Missing entries are 1.0,
    ///   extra entries are ignored, non-positive entries keep the input
    ///   spacing of that axis.
    pub fn new(pixdim: Vec<f64>) -> Self {
        Self {
            pixdim,
            diagonal: false,
            mode: GridSampleMode::Bilinear,
            padding_mode: GridSamplePadMode::Border,
            align_corners: false,
        }
    }

    /// Resample onto a diagonal affine, dropping rotation and shear.
    pub fn with_diagonal(mut self, diagonal: bool) -> Self {
        self.diagonal = diagonal;
        self
    }

    pub fn with_mode(mut self, mode: GridSampleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: GridSamplePadMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
        self
    }

    /// Resample `image` with voxel-to-world `affine` (identity if `None`).
    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &self,
        image: &ImageArray<B, K>,
        affine: Option<&DMatrix<f64>>,
    ) -> Result<AffineOutput<B>> {
        self.resample(image, affine, None)
    }

    /// Like [`Spacing::apply`] with an explicit output spatial shape.
    ///
    /// Useful when inverting a previous spacing change whose shape cannot be
    /// recovered exactly from the affines.
    pub fn apply_with_shape<B: Backend, K: ArrayKind<B>>(
        &self,
        image: &ImageArray<B, K>,
        affine: Option<&DMatrix<f64>>,
        output_spatial_shape: &[usize],
    ) -> Result<AffineOutput<B>> {
        if output_spatial_shape.len() != image.spatial_rank() {
            return Err(TransformError::dimension_mismatch(format!(
                "output shape has {} entries for {} spatial axes",
                output_spatial_shape.len(),
                image.spatial_rank()
            )));
        }
        self.resample(image, affine, Some(output_spatial_shape))
    }

    fn resample<B: Backend, K: ArrayKind<B>>(
        &self,
        image: &ImageArray<B, K>,
        affine: Option<&DMatrix<f64>>,
        output_spatial_shape: Option<&[usize]>,
    ) -> Result<AffineOutput<B>> {
        let sr = image.spatial_rank();
        let original_affine = affine
            .cloned()
            .unwrap_or_else(|| DMatrix::identity(sr + 1, sr + 1));
        let affine_ = to_affine_nd(sr, &original_affine)?;

        let mut out_d: Vec<f64> = self.pixdim.iter().take(sr).copied().collect();
        out_d.resize(sr, 1.0);

        let mut new_affine = zoom_affine(&affine_, &out_d, self.diagonal)?;
        let (output_shape, offset) = compute_shape_offset(image.spatial_shape(), &affine_, &new_affine)?;
        for (axis, &o) in offset.iter().enumerate() {
            new_affine[(axis, sr)] = o;
        }
        let inverse = affine_
            .clone()
            .try_inverse()
            .ok_or_else(|| TransformError::numerical("input affine is singular"))?;
        let transform = inverse * &new_affine;
        let new_affine_out = embed_affine(&original_affine, &new_affine)?;

        if allclose(&transform, &DMatrix::identity(sr + 1, sr + 1), 1e-5, IDENTITY_ATOL) {
            debug!(spacing = ?out_d, "voxel transform is identity, skipping resampling");
            return Ok(AffineOutput {
                array: image.to_float(),
                original_affine,
                affine: new_affine_out,
            });
        }

        let shape = output_spatial_shape.unwrap_or(&output_shape);
        let grid = Grid::<B>::create(shape, &image.device())?.transform(&transform)?;
        let array = Resampler::new()
            .with_mode(self.mode)
            .with_padding_mode(self.padding_mode)
            .with_align_corners(self.align_corners)
            .apply(image, Some(&grid))?;
        Ok(AffineOutput {
            array,
            original_affine,
            affine: new_affine_out,
        })
    }
}
