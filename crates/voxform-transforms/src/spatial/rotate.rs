use burn::tensor::backend::Backend;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use voxform_core::spatial::{create_rotate, create_translate};
use voxform_core::{
    ArrayKind, Grid, GridSampleMode, GridSamplePadMode, ImageArray, Resampler, Result, TransformError,
};

use super::Resampled;

/// Rotate a 2D or 3D image about its centre by interpolation.
///
/// 2D images use one angle. 3D images use three, rotating about axis 0, 1 and
/// 2 in turn; a single angle is repeated for every axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotate {
    angle: Vec<f64>,
    keep_size: bool,
    mode: GridSampleMode,
    padding_mode: GridSamplePadMode,
    align_corners: bool,
}

impl Rotate {
    /// Rotate by `angle` radians.
    pub fn new(angle: Vec<f64>) -> Self {
        Self {
            angle,
            keep_size: true,
            mode: GridSampleMode::Bilinear,
            padding_mode: GridSamplePadMode::Border,
            align_corners: false,
        }
    }

    /// Keep the input shape (default), or grow the output to hold every
    /// rotated corner.
    pub fn with_keep_size(mut self, keep_size: bool) -> Self {
        self.keep_size = keep_size;
        self
    }

    pub fn with_mode(mut self, mode: GridSampleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: GridSamplePadMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
        self
    }

    pub fn angle(&self) -> &[f64] {
        &self.angle
    }

    /// Voxel-to-voxel matrix and output spatial shape for an input shape.
    pub fn plan(&self, input: &[usize]) -> Result<(DMatrix<f64>, Vec<usize>)> {
        let rank = input.len();
        let n_angles = match rank {
            2 => 1,
            3 => 3,
            _ => {
                return Err(TransformError::dimension_mismatch(format!(
                    "rotation needs 2 or 3 spatial axes, got {}",
                    rank
                )))
            }
        };
        let angles = match self.angle.len() {
            1 => vec![self.angle[0]; n_angles],
            n if n == n_angles => self.angle.clone(),
            n => {
                return Err(TransformError::invalid_configuration(format!(
                    "{} spatial axes take {} angles, got {}",
                    rank, n_angles, n
                )))
            }
        };
        let rotation = create_rotate(rank, &angles)?;

        let output: Vec<usize> = if self.keep_size {
            input.to_vec()
        } else {
            bounding_shape(&rotation, input)
        };
        let in_centre: Vec<f64> = input.iter().map(|&n| (n as f64 - 1.0) / 2.0).collect();
        let out_centre: Vec<f64> = output.iter().map(|&n| -(n as f64 - 1.0) / 2.0).collect();
        let matrix = create_translate(rank, &in_centre) * rotation * create_translate(rank, &out_centre);
        Ok((matrix, output))
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<Resampled<B>> {
        let (matrix, output) = self.plan(image.spatial_shape())?;
        let grid = Grid::<B>::create(&output, &image.device())?.transform(&matrix)?;
        let array = Resampler::new()
            .with_mode(self.mode)
            .with_padding_mode(self.padding_mode)
            .with_align_corners(self.align_corners)
            .apply(image, Some(&grid))?;
        Ok(Resampled { array, matrix })
    }
}

/// Extent of the box `[0, n]` per axis after rotation, rounded to the nearest
/// voxel count.
fn bounding_shape(rotation: &DMatrix<f64>, input: &[usize]) -> Vec<usize> {
    let rank = input.len();
    let linear = rotation.view((0, 0), (rank, rank));
    let mut lo = vec![f64::INFINITY; rank];
    let mut hi = vec![f64::NEG_INFINITY; rank];
    for corner in 0..1usize << rank {
        let point = DVector::from_iterator(
            rank,
            (0..rank).map(|axis| {
                if (corner >> axis) & 1 == 1 {
                    input[axis] as f64
                } else {
                    0.0
                }
            }),
        );
        let rotated = linear * point;
        for axis in 0..rank {
            lo[axis] = lo[axis].min(rotated[axis]);
            hi[axis] = hi[axis].max(rotated[axis]);
        }
    }
    lo.iter()
        .zip(&hi)
        .map(|(l, h)| (h - l + 0.5) as usize)
        .collect()
}
