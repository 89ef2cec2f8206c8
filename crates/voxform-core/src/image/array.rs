//! Channel-first N-dimensional image array.
//!
//! `ImageArray` stores its voxels as a flat burn tensor together with a
//! runtime shape `[C, S0, S1, ...]`. Keeping the rank dynamic lets one
//! operator implementation serve 2D, 3D and higher-dimensional data, while the
//! burn backend decides whether the buffer lives on the host (`burn-ndarray`)
//! or on an accelerator.

use std::fmt;

use burn::tensor::backend::Backend;
use burn::tensor::{BasicOps, Bool, Float, Int, Tensor, TensorData};

use super::index::{numel, IndexMap};
use crate::error::{Result, TransformError};

/// Tensor kinds an `ImageArray` may hold.
///
/// Re-indexing operators keep the kind unchanged; interpolating operators
/// convert to `Float` through [`ArrayKind::into_float`].
pub trait ArrayKind<B: Backend>: BasicOps<B> {
    /// Convert a tensor of this kind to a floating point tensor.
    fn into_float<const D: usize>(tensor: Tensor<B, D, Self>) -> Tensor<B, D>;

    /// Gather columns of a `[C, N]` matrix.
    fn select_columns(tensor: Tensor<B, 2, Self>, indices: Tensor<B, 1, Int>) -> Tensor<B, 2, Self>;
}

impl<B: Backend> ArrayKind<B> for Float {
    fn into_float<const D: usize>(tensor: Tensor<B, D, Self>) -> Tensor<B, D> {
        tensor
    }

    fn select_columns(tensor: Tensor<B, 2, Self>, indices: Tensor<B, 1, Int>) -> Tensor<B, 2, Self> {
        tensor.select(1, indices)
    }
}

impl<B: Backend> ArrayKind<B> for Int {
    fn into_float<const D: usize>(tensor: Tensor<B, D, Self>) -> Tensor<B, D> {
        tensor.float()
    }

    fn select_columns(tensor: Tensor<B, 2, Self>, indices: Tensor<B, 1, Int>) -> Tensor<B, 2, Self> {
        tensor.select(1, indices)
    }
}

impl<B: Backend> ArrayKind<B> for Bool {
    fn into_float<const D: usize>(tensor: Tensor<B, D, Self>) -> Tensor<B, D> {
        tensor.float()
    }

    // Masks are gathered through their integer form.
    fn select_columns(tensor: Tensor<B, 2, Self>, indices: Tensor<B, 1, Int>) -> Tensor<B, 2, Self> {
        tensor.int().select(1, indices).bool()
    }
}

/// Channel-first image array with a runtime spatial rank.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `K` - The tensor kind (`Float` for intensities, `Int` for label maps)
///
/// # Invariants
/// * `shape[0]` is the channel axis and is never treated as spatial.
/// * At least one spatial axis is present.
/// * The flat tensor holds exactly `shape.iter().product()` elements.
pub struct ImageArray<B: Backend, K: ArrayKind<B> = Float> {
    data: Tensor<B, 1, K>,
    shape: Vec<usize>,
}

impl<B: Backend, K: ArrayKind<B>> Clone for ImageArray<B, K> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            shape: self.shape.clone(),
        }
    }
}

impl<B: Backend, K: ArrayKind<B>> fmt::Debug for ImageArray<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageArray")
            .field("shape", &self.shape)
            .finish()
    }
}

impl<B: Backend, K: ArrayKind<B>> ImageArray<B, K> {
    /// Wrap a flat tensor with a channel-first shape.
    ///
    /// # Arguments
    /// * `data` - Flat tensor in row-major order
    /// * `shape` - `[C, S0, S1, ...]`
    ///
    /// # Errors
    /// `DimensionMismatch` when no spatial axis is present, `ShapeMismatch`
    /// when the element count disagrees with the shape.
    pub fn new(data: Tensor<B, 1, K>, shape: Vec<usize>) -> Result<Self> {
        if shape.len() < 2 {
            return Err(TransformError::dimension_mismatch(format!(
                "image must have a channel axis and at least one spatial axis, got shape {:?}",
                shape
            )));
        }
        let expected = numel(&shape);
        let actual = data.dims()[0];
        if expected != actual {
            return Err(TransformError::shape_mismatch(&[expected], &[actual]));
        }
        Ok(Self { data, shape })
    }

    /// Wrap a shaped tensor, taking its dimensions as the image shape.
    pub fn from_tensor<const D: usize>(tensor: Tensor<B, D, K>) -> Result<Self> {
        let shape = tensor.dims().to_vec();
        let len = numel(&shape);
        Self::new(tensor.reshape([len]), shape)
    }

    /// Full shape `[C, S0, S1, ...]`.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Spatial shape `[S0, S1, ...]`.
    pub fn spatial_shape(&self) -> &[usize] {
        &self.shape[1..]
    }

    /// Number of spatial axes.
    pub fn spatial_rank(&self) -> usize {
        self.shape.len() - 1
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// Number of voxels per channel.
    pub fn spatial_numel(&self) -> usize {
        numel(self.spatial_shape())
    }

    /// Flat tensor in row-major order.
    pub fn tensor(&self) -> &Tensor<B, 1, K> {
        &self.data
    }

    /// Consume the array and return the flat tensor.
    pub fn into_tensor(self) -> Tensor<B, 1, K> {
        self.data
    }

    /// Device holding the voxels.
    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Move the voxels to another device.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            data: self.data.to_device(device),
            shape: self.shape,
        }
    }

    /// Reinterpret the voxels with a new shape of equal element count.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self> {
        Self::new(self.data, shape)
    }

    /// View the voxels as a `[C, N]` matrix, one row per channel.
    pub fn channel_matrix(&self) -> Tensor<B, 2, K> {
        self.data
            .clone()
            .reshape([self.channels(), self.spatial_numel()])
    }

    /// Build an array from a `[C, N]` matrix and a spatial shape.
    pub fn from_channel_matrix(matrix: Tensor<B, 2, K>, spatial_shape: &[usize]) -> Result<Self> {
        let [channels, voxels] = matrix.dims();
        if voxels != numel(spatial_shape) {
            return Err(TransformError::shape_mismatch(
                &[numel(spatial_shape)],
                &[voxels],
            ));
        }
        let mut shape = Vec::with_capacity(spatial_shape.len() + 1);
        shape.push(channels);
        shape.extend_from_slice(spatial_shape);
        Self::new(matrix.reshape([channels * voxels]), shape)
    }

    /// Re-index the spatial voxels with a precomputed map.
    ///
    /// Output voxel `i` of every channel takes the value of input voxel
    /// `map.sources()[i]`. No arithmetic touches the values, so the tensor kind
    /// and every value are preserved exactly.
    pub fn remap(&self, map: &IndexMap) -> Result<Self> {
        if map.source_shape() != self.spatial_shape() {
            return Err(TransformError::shape_mismatch(
                map.source_shape(),
                self.spatial_shape(),
            ));
        }
        let indices = map.to_tensor::<B>(&self.device());
        let gathered = K::select_columns(self.channel_matrix(), indices);
        Self::from_channel_matrix(gathered, map.target_shape())
    }

    /// Concatenate arrays along the channel axis.
    pub fn concat_channels(arrays: Vec<Self>) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| TransformError::missing_input("no arrays to concatenate"))?;
        let spatial = first.spatial_shape().to_vec();
        for array in &arrays {
            if array.spatial_shape() != spatial.as_slice() {
                return Err(TransformError::shape_mismatch(&spatial, array.spatial_shape()));
            }
        }
        let matrices = arrays.iter().map(|a| a.channel_matrix()).collect();
        Self::from_channel_matrix(Tensor::cat(matrices, 0), &spatial)
    }

    /// Floating point copy of the array.
    pub fn to_float(&self) -> ImageArray<B> {
        ImageArray {
            data: K::into_float(self.data.clone()),
            shape: self.shape.clone(),
        }
    }

    /// Read the voxels back to host memory as `f32`.
    pub fn to_vec_f32(&self) -> Result<Vec<f32>> {
        self.data
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TransformError::data(format!("{:?}", e)))
    }

    /// Read the voxels back to host memory as `i64`.
    pub fn to_vec_i64(&self) -> Result<Vec<i64>> {
        self.data
            .clone()
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| TransformError::data(format!("{:?}", e)))
    }
}

impl<B: Backend> ImageArray<B> {
    /// Create a float array from host values.
    pub fn from_floats(values: Vec<f32>, shape: Vec<usize>, device: &B::Device) -> Result<Self> {
        let len = values.len();
        let data = Tensor::<B, 1>::from_data(TensorData::new(values, [len]), device);
        Self::new(data, shape)
    }

    /// Array of zeros.
    pub fn zeros(shape: Vec<usize>, device: &B::Device) -> Result<Self> {
        let data = Tensor::<B, 1>::zeros([numel(&shape)], device);
        Self::new(data, shape)
    }

    /// Truncate to an integer label array.
    pub fn to_int(&self) -> ImageArray<B, Int> {
        ImageArray {
            data: self.data.clone().int(),
            shape: self.shape.clone(),
        }
    }
}

impl<B: Backend> ImageArray<B, Int> {
    /// Create an integer array from host values.
    pub fn from_ints(values: Vec<i64>, shape: Vec<usize>, device: &B::Device) -> Result<Self> {
        let len = values.len();
        let data = Tensor::<B, 1, Int>::from_data(TensorData::new(values, [len]), device);
        Self::new(data, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_shape_accessors() {
        let device = Default::default();
        let values: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let image = ImageArray::<TestBackend>::from_floats(values, vec![2, 3, 4], &device).unwrap();

        assert_eq!(image.shape(), &[2, 3, 4]);
        assert_eq!(image.spatial_shape(), &[3, 4]);
        assert_eq!(image.spatial_rank(), 2);
        assert_eq!(image.channels(), 2);
        assert_eq!(image.spatial_numel(), 12);
    }

    #[test]
    fn test_rejects_missing_spatial_axis() {
        let device = Default::default();
        let result = ImageArray::<TestBackend>::from_floats(vec![1.0, 2.0], vec![2], &device);
        assert!(matches!(result, Err(TransformError::DimensionMismatch(_))));
    }

    #[test]
    fn test_rejects_wrong_element_count() {
        let device = Default::default();
        let result = ImageArray::<TestBackend>::from_floats(vec![0.0; 5], vec![1, 2, 3], &device);
        assert!(matches!(result, Err(TransformError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_int_round_trip_and_cast() {
        let device = Default::default();
        let labels =
            ImageArray::<TestBackend, Int>::from_ints(vec![0, 1, 2, 3], vec![1, 2, 2], &device)
                .unwrap();
        assert_eq!(labels.to_vec_i64().unwrap(), vec![0, 1, 2, 3]);

        let float = labels.to_float();
        assert_eq!(float.to_vec_f32().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concat_channels() {
        let device = Default::default();
        let a = ImageArray::<TestBackend>::from_floats(vec![1.0, 2.0], vec![1, 2], &device).unwrap();
        let b = ImageArray::<TestBackend>::from_floats(vec![3.0, 4.0], vec![1, 2], &device).unwrap();

        let joined = ImageArray::concat_channels(vec![a, b]).unwrap();
        assert_eq!(joined.shape(), &[2, 2]);
        assert_eq!(joined.to_vec_f32().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
