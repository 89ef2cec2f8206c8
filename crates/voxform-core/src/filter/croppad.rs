//! Spatial cropping and padding.
//!
//! Both operations are pure re-indexing and go through an [`IndexMap`], so
//! crops keep the array kind. Constant padding additionally zeroes the new
//! border and therefore works on float arrays only.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::error::{Result, TransformError};
use crate::image::index::{numel, unravel};
use crate::image::{ArrayKind, ImageArray, IndexMap};
use crate::interpolation::NumpyPadMode;

fn check_rank(expected: usize, actual: usize, what: &str) -> Result<()> {
    if expected != actual {
        return Err(TransformError::dimension_mismatch(format!(
            "{} has {} entries for {} spatial axes",
            what, actual, expected
        )));
    }
    Ok(())
}

/// Crop a box `[start, start + size)` from every spatial axis.
///
/// # Errors
/// `InvalidConfiguration` when the box leaves the image.
pub fn spatial_crop<B: Backend, K: ArrayKind<B>>(
    image: &ImageArray<B, K>,
    start: &[usize],
    size: &[usize],
) -> Result<ImageArray<B, K>> {
    let rank = image.spatial_rank();
    check_rank(rank, start.len(), "crop start")?;
    check_rank(rank, size.len(), "crop size")?;
    let map = IndexMap::build(image.spatial_shape(), size, |target, source| {
        for (s, (&t, &o)) in source.iter_mut().zip(target.iter().zip(start)) {
            *s = t + o;
        }
    })?;
    image.remap(&map)
}

/// Crop a centred region of `roi_size`.
///
/// The region starts at `n / 2 - roi / 2` on each axis. Axes shorter than the
/// requested size are kept whole.
pub fn center_crop<B: Backend, K: ArrayKind<B>>(
    image: &ImageArray<B, K>,
    roi_size: &[usize],
) -> Result<ImageArray<B, K>> {
    check_rank(image.spatial_rank(), roi_size.len(), "crop size")?;
    let (start, size): (Vec<usize>, Vec<usize>) = image
        .spatial_shape()
        .iter()
        .zip(roi_size)
        .map(|(&n, &roi)| {
            let start = (n / 2).saturating_sub(roi / 2);
            let end = (start + roi).min(n);
            (start, end - start)
        })
        .unzip();
    spatial_crop(image, &start, &size)
}

/// Source index along an axis of `n` voxels for padded position `p`, where
/// `p` counts from the first original voxel. `None` means constant fill.
fn pad_source(p: i64, n: usize, mode: NumpyPadMode) -> Option<usize> {
    let n = n as i64;
    let inside = (0..n).contains(&p);
    let index = match mode {
        NumpyPadMode::Constant => {
            if !inside {
                return None;
            }
            p
        }
        NumpyPadMode::Edge => p.clamp(0, n - 1),
        NumpyPadMode::Reflect => {
            if n == 1 {
                0
            } else {
                let period = 2 * n - 2;
                let m = p.rem_euclid(period);
                if m >= n {
                    period - m
                } else {
                    m
                }
            }
        }
        NumpyPadMode::Symmetric => {
            let period = 2 * n;
            let m = p.rem_euclid(period);
            if m >= n {
                period - 1 - m
            } else {
                m
            }
        }
        NumpyPadMode::Wrap => p.rem_euclid(n),
    };
    Some(index as usize)
}

/// Pad every spatial axis by `(before, after)` voxels.
///
/// # Arguments
/// * `image` - Float image `[C, *spatial]`
/// * `pads` - One `(before, after)` pair per spatial axis
/// * `mode` - How the new voxels are filled
pub fn spatial_pad<B: Backend>(
    image: &ImageArray<B>,
    pads: &[(usize, usize)],
    mode: NumpyPadMode,
) -> Result<ImageArray<B>> {
    let rank = image.spatial_rank();
    check_rank(rank, pads.len(), "padding")?;
    if pads.iter().all(|&(a, b)| a == 0 && b == 0) {
        return Ok(image.clone());
    }
    let shape = image.spatial_shape().to_vec();
    let padded: Vec<usize> = shape
        .iter()
        .zip(pads)
        .map(|(&n, &(before, after))| n + before + after)
        .collect();

    let map = IndexMap::build(&shape, &padded, |target, source| {
        for axis in 0..target.len() {
            let p = target[axis] as i64 - pads[axis].0 as i64;
            source[axis] = pad_source(p, shape[axis], mode).unwrap_or(0);
        }
    })?;
    let remapped = image.remap(&map)?;
    if mode != NumpyPadMode::Constant {
        return Ok(remapped);
    }

    let total = numel(&padded);
    let mut index = vec![0usize; rank];
    let mask: Vec<f32> = (0..total)
        .map(|flat| {
            unravel(flat, &padded, &mut index);
            let inside = (0..rank).all(|axis| {
                let p = index[axis] as i64 - pads[axis].0 as i64;
                pad_source(p, shape[axis], mode).is_some()
            });
            if inside {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let mask = Tensor::<B, 1>::from_data(TensorData::new(mask, [total]), &image.device())
        .reshape([1, total]);
    ImageArray::from_channel_matrix(remapped.channel_matrix() * mask, &padded)
}
