//! Affine sampling grids.

use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use voxform_core::spatial::about_point;
use voxform_core::{AffineParams, Grid, Result, TransformError};

use crate::random::{rng_from_seed, ParamRange, Randomizable};

/// Affine parameters realized by a randomized operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineDraw {
    pub params: AffineParams,
    /// `params` composed for the spatial rank of the call.
    pub matrix: DMatrix<f64>,
}

/// Grid transformed by a homogeneous affine matrix.
///
/// The matrix is either composed from [`AffineParams`] or given directly; a
/// given matrix wins. It acts about a pivot, by default the centre voxel of
/// the grid, so translations are relative to the image centre.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffineGrid {
    params: AffineParams,
    affine: Option<DMatrix<f64>>,
}

impl AffineGrid {
    pub fn new(params: AffineParams) -> Self {
        Self { params, affine: None }
    }

    /// Use `affine` as is, ignoring any parameters.
    pub fn from_matrix(affine: DMatrix<f64>) -> Self {
        Self {
            params: AffineParams::default(),
            affine: Some(affine),
        }
    }

    pub fn params(&self) -> &AffineParams {
        &self.params
    }

    /// Matrix for grids of `spatial_rank` axes.
    pub fn matrix(&self, spatial_rank: usize) -> Result<DMatrix<f64>> {
        match &self.affine {
            Some(affine) => {
                if affine.nrows() != spatial_rank + 1 || affine.ncols() != spatial_rank + 1 {
                    return Err(TransformError::dimension_mismatch(format!(
                        "{}x{} affine for {} spatial axes",
                        affine.nrows(),
                        affine.ncols(),
                        spatial_rank
                    )));
                }
                Ok(affine.clone())
            }
            None => self.params.to_matrix(spatial_rank),
        }
    }

    /// Transform `grid` about `centre`. Returns the grid and the matrix.
    pub fn transform_grid<B: Backend>(&self, grid: &Grid<B>, centre: &[f64]) -> Result<(Grid<B>, DMatrix<f64>)> {
        let matrix = self.matrix(grid.spatial_rank())?;
        let transformed = grid.transform(&about_point(&matrix, centre))?;
        Ok((transformed, matrix))
    }

    /// Transform `grid`, or an identity grid of `spatial_size`, about its
    /// centre voxel.
    ///
    /// # Errors
    /// `MissingInput` when neither a grid nor a size is given.
    pub fn apply<B: Backend>(
        &self,
        spatial_size: Option<&[usize]>,
        grid: Option<Grid<B>>,
        device: &B::Device,
    ) -> Result<(Grid<B>, DMatrix<f64>)> {
        let grid = match (grid, spatial_size) {
            (Some(grid), _) => grid,
            (None, Some(size)) => Grid::create(size, device)?,
            (None, None) => {
                return Err(TransformError::missing_input(
                    "affine grid needs a grid or a spatial size",
                ))
            }
        };
        let centre = grid.centre();
        self.transform_grid(&grid, &centre)
    }
}

/// Ranges the elementary affine parameters are drawn from.
///
/// One range per parameter entry; an empty list leaves that component out.
/// Scale draws are offsets from 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffineRanges {
    #[serde(default)]
    pub rotate: Vec<ParamRange>,
    #[serde(default)]
    pub shear: Vec<ParamRange>,
    #[serde(default)]
    pub translate: Vec<ParamRange>,
    #[serde(default)]
    pub scale: Vec<ParamRange>,
}

impl AffineRanges {
    /// Draw rotate, shear, translate and scale parameters in that order.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> AffineParams {
        let mut draw = |ranges: &[ParamRange]| -> Vec<f64> {
            ranges.iter().map(|r| r.sample(&mut *rng)).collect()
        };
        let rotate = draw(&self.rotate);
        let shear = draw(&self.shear);
        let translate = draw(&self.translate);
        let scale = draw(&self.scale).into_iter().map(|s| s + 1.0).collect();
        AffineParams {
            rotate,
            shear,
            translate,
            scale,
        }
    }
}

/// [`AffineGrid`] with parameters drawn on every call.
#[derive(Debug, Clone)]
pub struct RandAffineGrid {
    ranges: AffineRanges,
    rng: ChaCha8Rng,
}

impl RandAffineGrid {
    pub fn new(ranges: AffineRanges) -> Self {
        Self {
            ranges,
            rng: rng_from_seed(None),
        }
    }

    pub fn ranges(&self) -> &AffineRanges {
        &self.ranges
    }

    /// Draw a fresh deterministic grid operator.
    pub fn draw(&mut self) -> AffineGrid {
        AffineGrid::new(self.ranges.sample(&mut self.rng))
    }

    /// Draw parameters and transform `grid` about `centre`.
    pub fn transform_grid<B: Backend>(&mut self, grid: &Grid<B>, centre: &[f64]) -> Result<(Grid<B>, AffineDraw)> {
        let affine_grid = self.draw();
        let (grid, matrix) = affine_grid.transform_grid(grid, centre)?;
        Ok((
            grid,
            AffineDraw {
                params: affine_grid.params,
                matrix,
            },
        ))
    }

    /// Draw parameters and transform `grid`, or an identity grid of
    /// `spatial_size`, about its centre voxel.
    pub fn apply<B: Backend>(
        &mut self,
        spatial_size: Option<&[usize]>,
        grid: Option<Grid<B>>,
        device: &B::Device,
    ) -> Result<(Grid<B>, AffineDraw)> {
        let affine_grid = self.draw();
        let (grid, matrix) = affine_grid.apply(spatial_size, grid, device)?;
        Ok((
            grid,
            AffineDraw {
                params: affine_grid.params,
                matrix,
            },
        ))
    }
}

impl Randomizable for RandAffineGrid {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use std::f64::consts::FRAC_PI_2;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rotation_about_centre() {
        let device = Default::default();
        let params = AffineParams {
            rotate: vec![FRAC_PI_2],
            ..Default::default()
        };
        let (grid, matrix) = AffineGrid::new(params)
            .apply::<TestBackend>(Some(&[3, 3]), None, &device)
            .unwrap();
        assert!((matrix[(0, 1)] + 1.0).abs() < 1e-12);
        let values = grid.array().to_vec_f32().unwrap();
        // Centre voxel is fixed; voxel (0, 0) moves to (2, 0).
        assert!((values[4] - 1.0).abs() < 1e-5 && (values[13] - 1.0).abs() < 1e-5);
        assert!((values[0] - 2.0).abs() < 1e-5 && values[9].abs() < 1e-5);
    }

    #[test]
    fn test_matrix_overrides_params() {
        let params = AffineParams {
            translate: vec![5.0, 5.0],
            ..Default::default()
        };
        let mut grid = AffineGrid::from_matrix(DMatrix::identity(3, 3));
        grid.params = params;
        assert_eq!(grid.matrix(2).unwrap(), DMatrix::identity(3, 3));
        assert!(grid.matrix(3).is_err());
    }

    #[test]
    fn test_requires_grid_or_size() {
        let device = Default::default();
        let out = AffineGrid::default().apply::<TestBackend>(None, None, &device);
        assert!(out.is_err());
    }

    #[test]
    fn test_translation_shifts_grid() {
        let device = Default::default();
        let params = AffineParams {
            translate: vec![1.0, -2.0],
            ..Default::default()
        };
        let (grid, _) = AffineGrid::new(params)
            .apply::<TestBackend>(Some(&[2, 2]), None, &device)
            .unwrap();
        let values = grid.array().to_vec_f32().unwrap();
        assert_eq!(&values[0..4], &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(&values[4..8], &[-2.0, -1.0, -2.0, -1.0]);
    }

    #[test]
    fn test_random_grid_draws_within_ranges() {
        let ranges = AffineRanges {
            rotate: vec![ParamRange::Symmetric(0.5)],
            scale: vec![ParamRange::Interval(0.1, 0.2), ParamRange::Interval(0.1, 0.2)],
            ..Default::default()
        };
        let mut op = RandAffineGrid::new(ranges).seeded(4);
        let device = Default::default();
        let (_, draw) = op.apply::<TestBackend>(Some(&[4, 4]), None, &device).unwrap();
        assert!(draw.params.rotate[0].abs() < 0.5);
        assert!(draw.params.scale.iter().all(|s| (1.1..1.2).contains(s)));
        assert!(draw.params.shear.is_empty() && draw.params.translate.is_empty());
        assert_eq!(draw.matrix, draw.params.to_matrix(2).unwrap());
    }
}
