//! Deterministic spatial operators.
//!
//! Re-indexing operators (`Flip`, `Rotate90`, `Orientation`) are generic over
//! the array kind and never touch values. Interpolating operators sample as
//! float and always return float arrays.

pub mod coordinates;
pub mod flip;
pub mod orientation;
pub mod resize;
pub mod rotate;
pub mod rotate90;
pub mod spacing;
pub mod zoom;

pub use coordinates::AddCoordinateChannels;
pub use flip::Flip;
pub use orientation::Orientation;
pub use resize::{Resize, SizeMode};
pub use rotate::Rotate;
pub use rotate90::Rotate90;
pub use spacing::Spacing;
pub use zoom::Zoom;

use burn::tensor::backend::Backend;
use burn::tensor::Float;
use nalgebra::DMatrix;
use voxform_core::{ArrayKind, ImageArray, Result, TransformError};

/// Array together with its voxel-to-world affine before and after an
/// affine-aware operator.
pub struct AffineOutput<B: Backend, K: ArrayKind<B> = Float> {
    pub array: ImageArray<B, K>,
    /// Affine the caller passed in, or identity.
    pub original_affine: DMatrix<f64>,
    /// Affine of `array`, at the rank of `original_affine`.
    pub affine: DMatrix<f64>,
}

/// Resampled array and the voxel-to-voxel matrix that produced it.
///
/// The matrix maps output voxel coordinates to input voxel coordinates.
pub struct Resampled<B: Backend> {
    pub array: ImageArray<B>,
    pub matrix: DMatrix<f64>,
}

/// Resolve a requested spatial size against the image size.
///
/// `None` keeps the image size. A single value applies to every axis.
/// Non-positive entries fall back to the matching image axis.
pub(crate) fn fall_back_size(requested: Option<&[i64]>, image: &[usize]) -> Result<Vec<usize>> {
    let Some(requested) = requested else {
        return Ok(image.to_vec());
    };
    let rank = image.len();
    let expanded: Vec<i64> = match requested.len() {
        1 => vec![requested[0]; rank],
        n if n == rank => requested.to_vec(),
        n => {
            return Err(TransformError::dimension_mismatch(format!(
                "spatial size has {} entries for {} spatial axes",
                n, rank
            )))
        }
    };
    Ok(expanded
        .iter()
        .zip(image)
        .map(|(&r, &n)| if r > 0 { r as usize } else { n })
        .collect())
}

/// Whether a requested size resolves the same for every image.
pub(crate) fn is_static_size(requested: Option<&[i64]>) -> bool {
    requested.is_some_and(|size| !size.is_empty() && size.iter().all(|&s| s > 0))
}

/// Map spatial axes, possibly negative, to indices into the spatial shape.
///
/// `None` selects every spatial axis. Negative axes count from the last
/// spatial axis.
pub(crate) fn map_spatial_axes(rank: usize, axes: Option<&[isize]>) -> Result<Vec<usize>> {
    let Some(axes) = axes else {
        return Ok((0..rank).collect());
    };
    axes.iter()
        .map(|&a| {
            let mapped = if a < 0 { rank as isize + a } else { a };
            if mapped < 0 || mapped >= rank as isize {
                Err(TransformError::dimension_mismatch(format!(
                    "spatial axis {} out of range for {} spatial axes",
                    a, rank
                )))
            } else {
                Ok(mapped as usize)
            }
        })
        .collect()
}

/// Repeat a single value to `rank` entries, or check the length matches.
pub(crate) fn expand_to_rank(values: &[f64], rank: usize, what: &str) -> Result<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; rank]),
        n if n == rank => Ok(values.to_vec()),
        n => Err(TransformError::dimension_mismatch(format!(
            "{} has {} entries for {} spatial axes",
            what, n, rank
        ))),
    }
}
