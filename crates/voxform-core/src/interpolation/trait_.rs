//! Interpolator trait for sampling values at continuous coordinates.
//!
//! This module defines the core Interpolator trait that all grid sampling
//! methods implement.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator trait for sampling values at continuous voxel indices.
///
/// Boundary handling of the coordinates themselves (clamping, reflection) is
/// done by the caller; the interpolator only decides how neighbours that fall
/// outside the array contribute.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate every channel at the given continuous indices.
    ///
    /// # Arguments
    /// * `data` - Source voxels `[C, N]`, row-major over `shape`
    /// * `shape` - Spatial shape of the source
    /// * `indices` - One `[P]` coordinate tensor per spatial axis, in array axis
    ///   order
    /// * `zero_outside` - If true, neighbours outside the array contribute
    ///   zero; otherwise they are clamped to the border
    ///
    /// # Returns
    /// Tensor of sampled values `[C, P]`
    fn interpolate(
        &self,
        data: &Tensor<B, 2>,
        shape: &[usize],
        indices: &[Tensor<B, 1>],
        zero_outside: bool,
    ) -> Tensor<B, 2>;
}
