use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxform_core::{ArrayKind, ImageArray, IndexMap, Result};

use super::map_spatial_axes;

/// Reverse the voxel order along spatial axes. Shape and kind are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flip {
    spatial_axis: Option<Vec<isize>>,
}

impl Flip {
    /// Flip every spatial axis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the given spatial axes. Negative axes count from the last spatial
    /// axis.
    pub fn with_axes(axes: Vec<isize>) -> Self {
        Self {
            spatial_axis: Some(axes),
        }
    }

    pub fn axes(&self) -> Option<&[isize]> {
        self.spatial_axis.as_deref()
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<ImageArray<B, K>> {
        let shape = image.spatial_shape().to_vec();
        let axes = map_spatial_axes(shape.len(), self.axes())?;
        let mut flipped = vec![false; shape.len()];
        for axis in axes {
            flipped[axis] = true;
        }
        let map = IndexMap::build(&shape, &shape, |out, src| {
            for axis in 0..out.len() {
                src[axis] = if flipped[axis] { shape[axis] - 1 - out[axis] } else { out[axis] };
            }
        })?;
        image.remap(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Int;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn labels() -> ImageArray<TestBackend, Int> {
        ImageArray::from_ints((0..6).collect(), vec![1, 2, 3], &Default::default()).unwrap()
    }

    #[test]
    fn test_flip_all_axes() {
        let out = Flip::new().apply(&labels()).unwrap();
        assert_eq!(out.to_vec_i64().unwrap(), vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_flip_last_axis_negative() {
        let out = Flip::with_axes(vec![-1]).apply(&labels()).unwrap();
        assert_eq!(out.to_vec_i64().unwrap(), vec![2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn test_flip_first_axis() {
        let out = Flip::with_axes(vec![0]).apply(&labels()).unwrap();
        assert_eq!(out.shape(), &[1, 2, 3]);
        assert_eq!(out.to_vec_i64().unwrap(), vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn test_flip_axis_out_of_range() {
        assert!(Flip::with_axes(vec![2]).apply(&labels()).is_err());
    }
}
