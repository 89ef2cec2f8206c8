//! Separable resizing of channel-first arrays.
//!
//! Each spatial axis is resized independently. For one axis the resize is a
//! sparse linear map: every output voxel is a weighted sum of a few input
//! voxels ("taps"). The taps are computed on the host; applying them is one
//! gather and one multiply-add per tap slot on the device.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use super::mode::InterpolateMode;
use crate::error::{Result, TransformError};
use crate::image::index::{numel, unravel};
use crate::image::ImageArray;

/// Cubic convolution coefficient used by bicubic resizing.
const CUBIC_A: f64 = -0.75;

/// Input voxels and weights contributing to one output voxel.
type Taps = Vec<(usize, f64)>;

/// Resize every spatial axis of `image` to `size`.
///
/// # Arguments
/// * `image` - Float image `[C, *spatial]`
/// * `size` - Target spatial size, one entry per spatial axis
/// * `mode` - Interpolation rule
/// * `align_corners` - Only valid for linear and bicubic modes; `None` means
///   false
///
/// # Errors
/// `DimensionMismatch` when `size` has the wrong length, `InvalidConfiguration`
/// for zero-sized targets or `align_corners` with a non-interpolating mode.
pub fn interpolate<B: Backend>(
    image: &ImageArray<B>,
    size: &[usize],
    mode: InterpolateMode,
    align_corners: Option<bool>,
) -> Result<ImageArray<B>> {
    if size.len() != image.spatial_rank() {
        return Err(TransformError::dimension_mismatch(format!(
            "target size has {} entries for {} spatial axes",
            size.len(),
            image.spatial_rank()
        )));
    }
    if size.iter().any(|&s| s == 0) {
        return Err(TransformError::invalid_configuration(format!(
            "target size must be positive, got {:?}",
            size
        )));
    }
    let interpolating = matches!(
        mode,
        InterpolateMode::Linear
            | InterpolateMode::Bilinear
            | InterpolateMode::Trilinear
            | InterpolateMode::Bicubic
    );
    if align_corners.is_some() && !interpolating {
        return Err(TransformError::invalid_configuration(format!(
            "align_corners can only be set with interpolating modes, got '{}'",
            mode
        )));
    }
    let align = align_corners.unwrap_or(false);

    let mut current = image.clone();
    for (axis, &target) in size.iter().enumerate() {
        let source = current.spatial_shape()[axis];
        if source == target {
            continue;
        }
        let taps: Vec<Taps> = (0..target)
            .map(|o| axis_taps(o, source, target, mode, align))
            .collect();
        current = resize_axis(&current, axis, &taps)?;
    }
    Ok(current)
}

fn axis_taps(o: usize, n: usize, m: usize, mode: InterpolateMode, align: bool) -> Taps {
    let last = n - 1;
    // Source position of output voxel o.
    let position = |half_pixel_clamp: bool| -> f64 {
        if align {
            if m > 1 {
                o as f64 * (n as f64 - 1.0) / (m as f64 - 1.0)
            } else {
                0.0
            }
        } else {
            let src = (o as f64 + 0.5) * n as f64 / m as f64 - 0.5;
            if half_pixel_clamp {
                src.max(0.0)
            } else {
                src
            }
        }
    };

    match mode {
        InterpolateMode::Nearest => {
            let src = ((o as f64 * n as f64 / m as f64).floor() as usize).min(last);
            vec![(src, 1.0)]
        }
        InterpolateMode::Linear | InterpolateMode::Bilinear | InterpolateMode::Trilinear => {
            let src = position(true);
            let i0 = (src.floor() as usize).min(last);
            let i1 = if i0 < last { i0 + 1 } else { i0 };
            let lambda = src - i0 as f64;
            vec![(i0, 1.0 - lambda), (i1, lambda)]
        }
        InterpolateMode::Bicubic => {
            let src = position(false);
            let base = src.floor();
            let t = src - base;
            let weights = [
                cubic_far(t + 1.0),
                cubic_near(t),
                cubic_near(1.0 - t),
                cubic_far(2.0 - t),
            ];
            weights
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let idx = (base as i64 - 1 + k as i64).clamp(0, last as i64) as usize;
                    (idx, w)
                })
                .collect()
        }
        InterpolateMode::Area => {
            let start = o * n / m;
            let end = ((o + 1) * n).div_ceil(m);
            let w = 1.0 / (end - start) as f64;
            (start..end).map(|i| (i, w)).collect()
        }
    }
}

fn cubic_near(x: f64) -> f64 {
    ((CUBIC_A + 2.0) * x - (CUBIC_A + 3.0)) * x * x + 1.0
}

fn cubic_far(x: f64) -> f64 {
    ((CUBIC_A * x - 5.0 * CUBIC_A) * x + 8.0 * CUBIC_A) * x - 4.0 * CUBIC_A
}

/// Apply per-output taps along one spatial axis.
fn resize_axis<B: Backend>(image: &ImageArray<B>, axis: usize, taps: &[Taps]) -> Result<ImageArray<B>> {
    let device = image.device();
    let in_shape = image.spatial_shape().to_vec();
    let mut out_shape = in_shape.clone();
    out_shape[axis] = taps.len();

    let total = numel(&out_shape);
    let slots = taps.iter().map(Vec::len).max().unwrap_or(0);

    let data = image.channel_matrix();
    let channels = image.channels();
    let mut output = Tensor::<B, 2>::zeros([channels, total], &device);
    let mut index = vec![0usize; out_shape.len()];

    for slot in 0..slots {
        let mut sources = Vec::with_capacity(total);
        let mut weights = Vec::with_capacity(total);
        for flat in 0..total {
            unravel(flat, &out_shape, &mut index);
            let o = index[axis];
            let (src, w) = taps[o].get(slot).copied().unwrap_or((taps[o][0].0, 0.0));
            // Flat input offset: same multi-index with the axis coordinate replaced.
            let mut offset = 0usize;
            for (a, &i) in index.iter().enumerate() {
                let coord = if a == axis { src } else { i };
                offset = offset * in_shape[a] + coord;
            }
            sources.push(offset as i64);
            weights.push(w as f32);
        }
        let idx = Tensor::<B, 1, Int>::from_data(TensorData::new(sources, [total]), &device);
        let w = Tensor::<B, 1>::from_data(TensorData::new(weights, [total]), &device).reshape([1, total]);
        output = output + data.clone().select(1, idx) * w;
    }
    ImageArray::from_channel_matrix(output, &out_shape)
}
