//! Host-side index arithmetic for row-major arrays.
//!
//! Pure re-indexing operators (flip, 90 degree rotation, reorientation,
//! cropping) are expressed as an `IndexMap`: for every output voxel the flat
//! index of the input voxel it copies. The map is computed once on the host and
//! applied on the device with a single gather.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use crate::error::{Result, TransformError};

/// Number of elements in an array of the given shape.
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major strides of a shape.
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Flat index to multi-index.
pub fn unravel(mut flat: usize, shape: &[usize], out: &mut [usize]) {
    for axis in (0..shape.len()).rev() {
        out[axis] = flat % shape[axis];
        flat /= shape[axis];
    }
}

/// Gather map from a source spatial shape to a target spatial shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    source_shape: Vec<usize>,
    target_shape: Vec<usize>,
    sources: Vec<i64>,
}

impl IndexMap {
    /// Build a map by asking, for every target multi-index, which source
    /// multi-index it reads.
    ///
    /// # Arguments
    /// * `source_shape` - Spatial shape of the input
    /// * `target_shape` - Spatial shape of the output
    /// * `source_of` - Writes the source multi-index for a target multi-index
    ///
    /// # Errors
    /// `InvalidConfiguration` if `source_of` produces an out-of-range index.
    pub fn build<F>(source_shape: &[usize], target_shape: &[usize], mut source_of: F) -> Result<Self>
    where
        F: FnMut(&[usize], &mut [usize]),
    {
        let src_strides = strides(source_shape);
        let total = numel(target_shape);
        let mut target = vec![0usize; target_shape.len()];
        let mut source = vec![0usize; source_shape.len()];
        let mut sources = Vec::with_capacity(total);

        for flat in 0..total {
            unravel(flat, target_shape, &mut target);
            source_of(&target, &mut source);
            let mut offset = 0;
            for (axis, (&s, &n)) in source.iter().zip(source_shape).enumerate() {
                if s >= n {
                    return Err(TransformError::invalid_configuration(format!(
                        "index {} out of range for axis {} of size {}",
                        s, axis, n
                    )));
                }
                offset += s * src_strides[axis];
            }
            sources.push(offset as i64);
        }

        Ok(Self {
            source_shape: source_shape.to_vec(),
            target_shape: target_shape.to_vec(),
            sources,
        })
    }

    /// Spatial shape the map reads from.
    pub fn source_shape(&self) -> &[usize] {
        &self.source_shape
    }

    /// Spatial shape the map produces.
    pub fn target_shape(&self) -> &[usize] {
        &self.target_shape
    }

    /// Flat source index of every target voxel.
    pub fn sources(&self) -> &[i64] {
        &self.sources
    }

    /// Upload the map as an integer index tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1, Int> {
        Tensor::<B, 1, Int>::from_data(
            TensorData::new(self.sources.clone(), [self.sources.len()]),
            device,
        )
    }
}
