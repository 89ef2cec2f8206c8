//! Homogeneous coordinate grids.
//!
//! Grids store voxel-index coordinates plus a channel of ones, so affine
//! matrices apply with one matmul and displacement fields add channel-wise.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use nalgebra::DMatrix;

use super::array::ImageArray;
use super::index::{numel, unravel};
use crate::error::{Result, TransformError};

/// Dense homogeneous coordinate grid.
///
/// A grid for spatial size `[S0, .., S(D-1)]` is a float array of shape
/// `[D + 1, S0, .., S(D-1)]`: channels `0..D` hold voxel-index coordinates in
/// array axis order and channel `D` holds the homogeneous component.
#[derive(Debug, Clone)]
pub struct Grid<B: Backend> {
    array: ImageArray<B>,
}

impl<B: Backend> Grid<B> {
    /// Wrap an existing array as a grid.
    ///
    /// # Errors
    /// `DimensionMismatch` when the channel count is not spatial rank + 1.
    pub fn new(array: ImageArray<B>) -> Result<Self> {
        if array.channels() != array.spatial_rank() + 1 {
            return Err(TransformError::dimension_mismatch(format!(
                "grid with {} spatial axes needs {} channels, got {}",
                array.spatial_rank(),
                array.spatial_rank() + 1,
                array.channels()
            )));
        }
        Ok(Self { array })
    }

    /// Generate the identity grid of 0-based voxel indices.
    ///
    /// # Arguments
    /// * `spatial_size` - The grid size `[S0, S1, ...]`
    /// * `device` - The device to create the tensor on
    ///
    /// # Returns
    /// Grid of shape `[D + 1, S0, S1, ...]`
    pub fn create(spatial_size: &[usize], device: &B::Device) -> Result<Self> {
        let axes: Vec<Vec<f32>> = spatial_size
            .iter()
            .map(|&n| (0..n).map(|i| i as f32).collect())
            .collect();
        Self::from_axes(spatial_size, &axes, device)
    }

    /// Generate a coarse control-point grid for elastic deformation.
    ///
    /// Control points are `spacing[d]` voxels apart and centred on the centre
    /// voxel of `spatial_size`. The point count along each axis covers the
    /// target extent with a margin so that a cubic upsampling by `spacing`
    /// followed by a centre crop reaches every target voxel.
    pub fn create_control(spatial_size: &[usize], spacing: &[f64], device: &B::Device) -> Result<Self> {
        if spacing.len() != spatial_size.len() {
            return Err(TransformError::dimension_mismatch(format!(
                "control grid spacing has {} entries for {} spatial axes",
                spacing.len(),
                spatial_size.len()
            )));
        }
        if spacing.iter().any(|&s| s <= 0.0) {
            return Err(TransformError::invalid_configuration(
                "control grid spacing must be positive",
            ));
        }
        let counts = control_grid_size(spatial_size, spacing);
        let axes: Vec<Vec<f32>> = counts
            .iter()
            .zip(spatial_size.iter().zip(spacing))
            .map(|(&count, (&size, &step))| {
                let centre = (size as f64 - 1.0) / 2.0;
                let half = (count as f64 - 1.0) / 2.0;
                (0..count)
                    .map(|i| (centre + (i as f64 - half) * step) as f32)
                    .collect()
            })
            .collect();
        Self::from_axes(&counts, &axes, device)
    }

    fn from_axes(spatial_size: &[usize], axes: &[Vec<f32>], device: &B::Device) -> Result<Self> {
        let rank = spatial_size.len();
        if rank == 0 {
            return Err(TransformError::dimension_mismatch(
                "grid needs at least one spatial axis",
            ));
        }
        let total = numel(spatial_size);
        let mut values = vec![0.0f32; (rank + 1) * total];
        let mut index = vec![0usize; rank];
        for flat in 0..total {
            unravel(flat, spatial_size, &mut index);
            for axis in 0..rank {
                values[axis * total + flat] = axes[axis][index[axis]];
            }
            values[rank * total + flat] = 1.0;
        }

        let mut shape = Vec::with_capacity(rank + 1);
        shape.push(rank + 1);
        shape.extend_from_slice(spatial_size);
        Self::new(ImageArray::from_floats(values, shape, device)?)
    }

    /// Spatial size the grid samples.
    pub fn spatial_shape(&self) -> &[usize] {
        self.array.spatial_shape()
    }

    /// Number of coordinate channels.
    pub fn spatial_rank(&self) -> usize {
        self.array.spatial_rank()
    }

    /// Borrow the underlying array.
    pub fn array(&self) -> &ImageArray<B> {
        &self.array
    }

    /// Consume the grid and return the underlying array.
    pub fn into_array(self) -> ImageArray<B> {
        self.array
    }

    /// Centre voxel coordinate of the grid extent, `(size - 1) / 2` per axis.
    pub fn centre(&self) -> Vec<f64> {
        self.spatial_shape()
            .iter()
            .map(|&n| (n as f64 - 1.0) / 2.0)
            .collect()
    }

    /// Apply a homogeneous matrix to every grid point.
    ///
    /// # Errors
    /// `DimensionMismatch` when the matrix is not `(D + 1) x (D + 1)`.
    pub fn transform(&self, matrix: &DMatrix<f64>) -> Result<Self> {
        let rows = self.spatial_rank() + 1;
        if matrix.nrows() != rows || matrix.ncols() != rows {
            return Err(TransformError::dimension_mismatch(format!(
                "grid with {} channels cannot be transformed by a {}x{} matrix",
                rows,
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        let device = self.array.device();
        let mut values = Vec::with_capacity(rows * rows);
        for r in 0..rows {
            for c in 0..rows {
                values.push(matrix[(r, c)] as f32);
            }
        }
        let m = Tensor::<B, 1>::from_data(TensorData::new(values, [rows * rows]), &device)
            .reshape([rows, rows]);
        let transformed = m.matmul(self.array.channel_matrix());
        Self::new(ImageArray::from_channel_matrix(transformed, self.spatial_shape())?)
    }

    /// Shift every coordinate channel by a constant.
    pub fn translate(&self, shift: &[f64]) -> Result<Self> {
        let rank = self.spatial_rank();
        if shift.len() != rank {
            return Err(TransformError::dimension_mismatch(format!(
                "shift has {} entries for {} spatial axes",
                shift.len(),
                rank
            )));
        }
        let device = self.array.device();
        let mut column: Vec<f32> = shift.iter().map(|&s| s as f32).collect();
        column.push(0.0);
        let offset =
            Tensor::<B, 1>::from_data(TensorData::new(column, [rank + 1]), &device).reshape([rank + 1, 1]);
        let shifted = self.array.channel_matrix() + offset;
        Self::new(ImageArray::from_channel_matrix(shifted, self.spatial_shape())?)
    }

    /// Add a displacement field `[D, *spatial]` to the coordinate channels.
    pub fn displace(&self, offsets: &ImageArray<B>) -> Result<Self> {
        let rank = self.spatial_rank();
        if offsets.channels() != rank || offsets.spatial_shape() != self.spatial_shape() {
            let mut expected = vec![rank];
            expected.extend_from_slice(self.spatial_shape());
            return Err(TransformError::shape_mismatch(&expected, offsets.shape()));
        }
        let device = self.array.device();
        let zeros = Tensor::<B, 2>::zeros([1, self.array.spatial_numel()], &device);
        let padded = Tensor::cat(vec![offsets.channel_matrix(), zeros], 0);
        let displaced = self.array.channel_matrix() + padded;
        Self::new(ImageArray::from_channel_matrix(displaced, self.spatial_shape())?)
    }

    /// Cartesian coordinates `[D, N]`: coordinate channels divided by the
    /// homogeneous channel.
    pub fn coordinates(&self) -> Tensor<B, 2> {
        let rank = self.spatial_rank();
        let n = self.array.spatial_numel();
        let matrix = self.array.channel_matrix();
        let coords = matrix.clone().slice([0..rank, 0..n]);
        let homogeneous = matrix.slice([rank..rank + 1, 0..n]);
        coords / homogeneous
    }
}

/// Number of control points per axis for a target size and spacing.
///
/// Even sizes get `ceil((d - 1) / (2s) + 0.5) * 2 + 2` points, odd sizes
/// `ceil((d - 1) / (2s)) * 2 + 3`.
pub fn control_grid_size(spatial_size: &[usize], spacing: &[f64]) -> Vec<usize> {
    spatial_size
        .iter()
        .zip(spacing)
        .map(|(&d, &s)| {
            let half_extent = (d as f64 - 1.0) / (2.0 * s);
            if d % 2 == 0 {
                (half_extent + 0.5).ceil() as usize * 2 + 2
            } else {
                half_extent.ceil() as usize * 2 + 3
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_create_grid_2d() {
        let device = Default::default();
        let grid = Grid::<TestBackend>::create(&[2, 3], &device).unwrap();

        assert_eq!(grid.array().shape(), &[3, 2, 3]);
        let values = grid.array().to_vec_f32().unwrap();
        // Axis 0 coordinates, axis 1 coordinates, ones.
        assert_eq!(&values[0..6], &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(&values[6..12], &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(&values[12..18], &[1.0; 6]);
    }

    #[test]
    fn test_control_grid_size() {
        assert_eq!(control_grid_size(&[4, 5], &[1.0, 1.0]), vec![6, 7]);
        assert_eq!(control_grid_size(&[10], &[2.0]), vec![8]);
    }

    #[test]
    fn test_control_grid_is_centred() {
        let device = Default::default();
        let grid = Grid::<TestBackend>::create_control(&[5], &[2.0], &device).unwrap();
        assert_eq!(grid.spatial_shape(), &[5]);
        let values = grid.array().to_vec_f32().unwrap();
        assert_eq!(&values[0..5], &[-2.0, 0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_transform_and_translate() {
        let device = Default::default();
        let grid = Grid::<TestBackend>::create(&[2, 2], &device).unwrap();
        let swap = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

        let swapped = grid.transform(&swap).unwrap().translate(&[10.0, 0.0]).unwrap();
        let coords = swapped.coordinates().into_data();
        let slice = coords.as_slice::<f32>().unwrap();
        assert_eq!(&slice[0..4], &[10.0, 11.0, 10.0, 11.0]);
        assert_eq!(&slice[4..8], &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_channel_count() {
        let device = Default::default();
        let array = ImageArray::<TestBackend>::zeros(vec![2, 2, 2], &device).unwrap();
        assert!(Grid::new(array).is_err());
    }
}
