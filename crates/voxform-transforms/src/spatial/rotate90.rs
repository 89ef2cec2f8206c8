use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use voxform_core::{ArrayKind, ImageArray, IndexMap, Result, TransformError};

use super::map_spatial_axes;

/// Rotate by `k` quarter turns in the plane of two spatial axes.
///
/// A positive `k` turns from the second axis towards the first. Values and
/// kind are preserved exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotate90 {
    k: i64,
    spatial_axes: (isize, isize),
}

impl Default for Rotate90 {
    fn default() -> Self {
        Self {
            k: 1,
            spatial_axes: (0, 1),
        }
    }
}

impl Rotate90 {
    /// Rotate `k` times in the plane of the first two spatial axes.
    pub fn new(k: i64) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Set the rotation plane. Negative axes count from the last spatial axis.
    pub fn with_spatial_axes(mut self, a: isize, b: isize) -> Self {
        self.spatial_axes = (a, b);
        self
    }

    pub fn k(&self) -> i64 {
        self.k
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<ImageArray<B, K>> {
        let shape = image.spatial_shape().to_vec();
        let axes = map_spatial_axes(shape.len(), Some(&[self.spatial_axes.0, self.spatial_axes.1]))?;
        let (a, b) = (axes[0], axes[1]);
        if a == b {
            return Err(TransformError::invalid_configuration(format!(
                "rotation plane needs two distinct axes, got {:?}",
                self.spatial_axes
            )));
        }

        let turns = self.k.rem_euclid(4);
        if turns == 0 {
            return Ok(image.clone());
        }
        let mut out_shape = shape.clone();
        if turns % 2 == 1 {
            out_shape.swap(a, b);
        }
        let (na, nb) = (shape[a], shape[b]);
        let map = IndexMap::build(&shape, &out_shape, |out, src| {
            src.copy_from_slice(out);
            let (oa, ob) = (out[a], out[b]);
            let (sa, sb) = match turns {
                1 => (ob, nb - 1 - oa),
                2 => (na - 1 - oa, nb - 1 - ob),
                _ => (na - 1 - ob, oa),
            };
            src[a] = sa;
            src[b] = sb;
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

    fn square() -> ImageArray<TestBackend, Int> {
        // [[0, 1], [2, 3]]
        ImageArray::from_ints(vec![0, 1, 2, 3], vec![1, 2, 2], &Default::default()).unwrap()
    }

    #[test]
    fn test_quarter_turns() {
        let cases = [
            (1, vec![1, 3, 0, 2]),
            (2, vec![3, 2, 1, 0]),
            (3, vec![2, 0, 3, 1]),
            (-1, vec![2, 0, 3, 1]),
            (4, vec![0, 1, 2, 3]),
        ];
        for (k, expected) in cases {
            let out = Rotate90::new(k).apply(&square()).unwrap();
            assert_eq!(out.to_vec_i64().unwrap(), expected, "k = {k}");
        }
    }

    #[test]
    fn test_non_square_swaps_shape() {
        let image =
            ImageArray::<TestBackend, Int>::from_ints((0..6).collect(), vec![1, 2, 3], &Default::default())
                .unwrap();
        let out = Rotate90::new(1).apply(&image).unwrap();
        assert_eq!(out.shape(), &[1, 3, 2]);
        // [[0, 1, 2], [3, 4, 5]] turned once: [[2, 5], [1, 4], [0, 3]]
        assert_eq!(out.to_vec_i64().unwrap(), vec![2, 5, 1, 4, 0, 3]);
    }

    #[test]
    fn test_plane_of_3d_volume() {
        let image =
            ImageArray::<TestBackend, Int>::from_ints((0..8).collect(), vec![1, 2, 2, 2], &Default::default())
                .unwrap();
        let out = Rotate90::new(2).with_spatial_axes(1, 2).apply(&image).unwrap();
        assert_eq!(out.to_vec_i64().unwrap(), vec![3, 2, 1, 0, 7, 6, 5, 4]);
    }

    #[test]
    fn test_same_axis_rejected() {
        assert!(Rotate90::new(1).with_spatial_axes(0, -2).apply(&square()).is_err());
    }
}
