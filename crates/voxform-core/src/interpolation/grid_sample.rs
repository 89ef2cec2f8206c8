//! Sampling at normalized grid coordinates.
//!
//! The sampling convention follows the common deep-learning `grid_sample`
//! layout: coordinates are normalized to `[-1, 1]` over each input axis and
//! the coordinate rows are ordered from the last array axis to the first.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::linear::LinearInterpolator;
use super::mode::{GridSampleMode, GridSamplePadMode};
use super::nearest::NearestNeighborInterpolator;
use super::trait_::Interpolator;
use crate::error::{Result, TransformError};
use crate::image::index::numel;
use crate::image::ImageArray;

/// Map voxel indices along an axis of `size` voxels to `[-1, 1]`.
pub fn normalize_coordinates<B: Backend>(x: Tensor<B, 1>, size: usize, align_corners: bool) -> Tensor<B, 1> {
    let s = size as f64;
    if align_corners {
        if size <= 1 {
            x.zeros_like()
        } else {
            x.mul_scalar(2.0 / (s - 1.0)).sub_scalar(1.0)
        }
    } else {
        x.mul_scalar(2.0).add_scalar(1.0).div_scalar(s).sub_scalar(1.0)
    }
}

/// Map normalized coordinates back to voxel indices.
pub fn unnormalize_coordinates<B: Backend>(g: Tensor<B, 1>, size: usize, align_corners: bool) -> Tensor<B, 1> {
    let s = size as f64;
    if align_corners {
        g.add_scalar(1.0).mul_scalar((s - 1.0) / 2.0)
    } else {
        g.add_scalar(1.0).mul_scalar(s).sub_scalar(1.0).div_scalar(2.0)
    }
}

/// Reflect coordinates into `[twice_low / 2, twice_high / 2]`.
fn reflect_coordinates<B: Backend>(x: Tensor<B, 1>, twice_low: f64, twice_high: f64) -> Tensor<B, 1> {
    if twice_low == twice_high {
        return x.zeros_like();
    }
    let min = twice_low / 2.0;
    let span = (twice_high - twice_low) / 2.0;
    let distance = x.sub_scalar(min).abs();
    let flips = distance.clone().div_scalar(span).floor();
    let extra = distance - flips.clone().mul_scalar(span);
    // 0 for an even number of flips, 1 for odd.
    let parity = flips.clone() - flips.div_scalar(2.0).floor().mul_scalar(2.0);
    let mirrored = extra.clone().mul_scalar(-2.0).add_scalar(span);
    extra + parity * mirrored + min
}

/// Voxel indices after the boundary rule. `Zeros` leaves them untouched; the
/// interpolator masks outside neighbours instead.
fn apply_padding<B: Backend>(
    x: Tensor<B, 1>,
    size: usize,
    padding: GridSamplePadMode,
    align_corners: bool,
) -> Tensor<B, 1> {
    let max = (size as f64 - 1.0).max(0.0);
    match padding {
        GridSamplePadMode::Zeros => x,
        GridSamplePadMode::Border => x.clamp(0.0, max),
        GridSamplePadMode::Reflection => {
            let s = size as f64;
            let reflected = if align_corners {
                reflect_coordinates(x, 0.0, 2.0 * (s - 1.0))
            } else {
                reflect_coordinates(x, -1.0, 2.0 * s - 1.0)
            };
            reflected.clamp(0.0, max)
        }
    }
}

/// Sample `input` at normalized grid locations.
///
/// # Arguments
/// * `input` - Image `[C, *spatial_in]`
/// * `grid` - Normalized coordinates `[D, P]`, row 0 for the last array axis
/// * `output_spatial` - Spatial shape of the result, `P` voxels in total
/// * `mode` - Interpolation rule
/// * `padding` - Boundary rule for samples outside the input
/// * `align_corners` - Whether `-1` and `1` address voxel centres (true) or
///   voxel edges (false)
///
/// # Returns
/// Image `[C, *output_spatial]`
pub fn grid_sample<B: Backend>(
    input: &ImageArray<B>,
    grid: &Tensor<B, 2>,
    output_spatial: &[usize],
    mode: GridSampleMode,
    padding: GridSamplePadMode,
    align_corners: bool,
) -> Result<ImageArray<B>> {
    let rank = input.spatial_rank();
    let [rows, points] = grid.dims();
    if rows != rank {
        return Err(TransformError::dimension_mismatch(format!(
            "grid has {} coordinate rows for {} spatial axes",
            rows, rank
        )));
    }
    if points != numel(output_spatial) {
        return Err(TransformError::shape_mismatch(&[numel(output_spatial)], &[points]));
    }

    let shape = input.spatial_shape();
    let indices: Vec<Tensor<B, 1>> = (0..rank)
        .map(|axis| {
            let row = rank - 1 - axis;
            let g = grid.clone().slice([row..row + 1, 0..points]).reshape([points]);
            let x = unnormalize_coordinates(g, shape[axis], align_corners);
            apply_padding(x, shape[axis], padding, align_corners)
        })
        .collect();

    let zero_outside = padding == GridSamplePadMode::Zeros;
    let data = input.channel_matrix();
    let sampled = match mode {
        GridSampleMode::Nearest => {
            NearestNeighborInterpolator::new().interpolate(&data, shape, &indices, zero_outside)
        }
        GridSampleMode::Bilinear => {
            LinearInterpolator::new().interpolate(&data, shape, &indices, zero_outside)
        }
    };
    ImageArray::from_channel_matrix(sampled, output_spatial)
}
