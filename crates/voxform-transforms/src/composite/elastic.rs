//! Random elastic deformation.
//!
//! Both operators build a dense sampling grid from a random displacement
//! field followed by a random affine transform about the output centre, then
//! resample the image through it. A call whose gate does not fire samples an
//! identity grid, which is a centred crop or pad to the output size.

use burn::tensor::backend::Backend;
use burn::tensor::Float;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use voxform_core::filter::center_crop;
use voxform_core::image::index::numel;
use voxform_core::interpolation::interpolate;
use voxform_core::{
    ArrayKind, GaussianFilter, Grid, GridSampleMode, GridSamplePadMode, ImageArray, InterpolateMode, Resampler,
    Result, TransformError,
};

use super::affine::{centre_of, centre_shift};
use super::affine_grid::{AffineDraw, AffineRanges, RandAffineGrid};
use super::deform_grid::RandDeformGrid;
use crate::random::{rng_from_seed, uniform, ProbabilityGate, Randomizable, Sampled};
use crate::randomized::DEFAULT_PROB;
use crate::spatial::fall_back_size;

/// Realized parameters of one elastic call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticDraw {
    /// Scale of the displacement field.
    pub magnitude: f64,
    /// Smoothing sigma of the dense field, volumes only.
    pub sigma: Option<f64>,
    pub affine: AffineDraw,
}

fn check_rank(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(TransformError::dimension_mismatch(format!(
            "{}D elastic deformation got an image with {} spatial axes",
            expected, actual
        )));
    }
    Ok(())
}

fn default_resampler() -> Resampler {
    Resampler::new()
        .with_padding_mode(GridSamplePadMode::Reflection)
        .with_align_corners(false)
}

/// Elastic deformation of 2D images through a coarse control grid.
///
/// Control points `spacing` voxels apart receive Gaussian offsets, the control
/// grid goes through a random affine, and the result is upsampled with
/// bicubic interpolation and centre-cropped to the output size.
#[derive(Debug, Clone)]
pub struct Rand2DElastic {
    gate: ProbabilityGate,
    deform_grid: RandDeformGrid,
    rand_affine_grid: RandAffineGrid,
    spatial_size: Option<Vec<i64>>,
    resampler: Resampler,
    rng: ChaCha8Rng,
}

impl Rand2DElastic {
    /// # Arguments
    /// * `spacing` - Control point distance per axis
    /// * `magnitude_range` - Bounds of the offset scale
    pub fn new(spacing: Vec<f64>, magnitude_range: (f64, f64)) -> Self {
        Self {
            gate: ProbabilityGate::new(DEFAULT_PROB),
            deform_grid: RandDeformGrid::new(spacing, magnitude_range),
            rand_affine_grid: RandAffineGrid::new(AffineRanges::default()),
            spatial_size: None,
            resampler: default_resampler(),
            rng: rng_from_seed(None),
        }
    }

    pub fn with_prob(mut self, prob: f64) -> Self {
        self.gate = ProbabilityGate::new(prob);
        self
    }

    pub fn with_ranges(mut self, ranges: AffineRanges) -> Self {
        self.rand_affine_grid = RandAffineGrid::new(ranges);
        self
    }

    /// Output spatial size. Non-positive entries keep the input size.
    pub fn with_spatial_size(mut self, spatial_size: Vec<i64>) -> Self {
        self.spatial_size = Some(spatial_size);
        self
    }

    pub fn with_mode(mut self, mode: GridSampleMode) -> Self {
        self.resampler = self.resampler.with_mode(mode);
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: GridSamplePadMode) -> Self {
        self.resampler = self.resampler.with_padding_mode(padding_mode);
        self
    }

    fn deformed_grid<B: Backend>(
        &mut self,
        size: &[usize],
        device: &B::Device,
    ) -> Result<(Grid<B>, ElasticDraw)> {
        let deformed = self.deform_grid.apply::<B>(size, device)?;
        let (control, affine) = self
            .rand_affine_grid
            .transform_grid(&deformed.grid, &centre_of(size))?;

        let spacing = self.deform_grid.resolved_spacing(size.len())?;
        let upsampled: Vec<usize> = control
            .spatial_shape()
            .iter()
            .zip(&spacing)
            .map(|(&k, &s)| ((k as f64 * s).floor() as usize).max(1))
            .collect();
        let dense = interpolate(control.array(), &upsampled, InterpolateMode::Bicubic, Some(false))?;
        let grid = Grid::new(center_crop(&dense, size)?)?;
        Ok((
            grid,
            ElasticDraw {
                magnitude: deformed.magnitude,
                sigma: None,
                affine,
            },
        ))
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, Float, ElasticDraw>> {
        let input = image.spatial_shape();
        check_rank(2, input.len())?;
        let size = fall_back_size(self.spatial_size.as_deref(), input)?;
        let device = image.device();

        let (grid, draw) = if self.gate.draw(&mut self.rng) {
            let (grid, draw) = self.deformed_grid::<B>(&size, &device)?;
            (grid, Some(draw))
        } else {
            (Grid::create(&size, &device)?, None)
        };
        let grid = grid.translate(&centre_shift(input, &size))?;
        let array = self.resampler.apply(image, Some(&grid))?;
        Ok(Sampled { array, draw })
    }
}

impl Randomizable for Rand2DElastic {
    fn set_random_state(&mut self, seed: u64) {
        let mut rng = rng_from_seed(Some(seed));
        self.deform_grid.set_random_state(rng.gen());
        self.rand_affine_grid.set_random_state(rng.gen());
        self.rng = rng;
    }
}

/// Elastic deformation of volumes through a smoothed dense field.
///
/// Every voxel of the output grid receives `U(-1, 1)` offsets, smoothed with a
/// Gaussian of random sigma and scaled by a random magnitude, before the
/// random affine.
#[derive(Debug, Clone)]
pub struct Rand3DElastic {
    gate: ProbabilityGate,
    sigma_range: (f64, f64),
    magnitude_range: (f64, f64),
    rand_affine_grid: RandAffineGrid,
    spatial_size: Option<Vec<i64>>,
    resampler: Resampler,
    rng: ChaCha8Rng,
}

impl Rand3DElastic {
    /// # Arguments
    /// * `sigma_range` - Bounds of the smoothing sigma in voxels
    /// * `magnitude_range` - Bounds of the displacement scale in voxels
    pub fn new(sigma_range: (f64, f64), magnitude_range: (f64, f64)) -> Self {
        Self {
            gate: ProbabilityGate::new(DEFAULT_PROB),
            sigma_range,
            magnitude_range,
            rand_affine_grid: RandAffineGrid::new(AffineRanges::default()),
            spatial_size: None,
            resampler: default_resampler(),
            rng: rng_from_seed(None),
        }
    }

    pub fn with_prob(mut self, prob: f64) -> Self {
        self.gate = ProbabilityGate::new(prob);
        self
    }

    pub fn with_ranges(mut self, ranges: AffineRanges) -> Self {
        self.rand_affine_grid = RandAffineGrid::new(ranges);
        self
    }

    /// Output spatial size. Non-positive entries keep the input size.
    pub fn with_spatial_size(mut self, spatial_size: Vec<i64>) -> Self {
        self.spatial_size = Some(spatial_size);
        self
    }

    pub fn with_mode(mut self, mode: GridSampleMode) -> Self {
        self.resampler = self.resampler.with_mode(mode);
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: GridSamplePadMode) -> Self {
        self.resampler = self.resampler.with_padding_mode(padding_mode);
        self
    }

    fn deformed_grid<B: Backend>(&mut self, size: &[usize], device: &B::Device) -> Result<(Grid<B>, ElasticDraw)> {
        let rank = size.len();
        let offsets: Vec<f32> = (0..rank * numel(size))
            .map(|_| uniform(&mut self.rng, -1.0, 1.0) as f32)
            .collect();
        let magnitude = uniform(&mut self.rng, self.magnitude_range.0, self.magnitude_range.1);
        let sigma = uniform(&mut self.rng, self.sigma_range.0, self.sigma_range.1);

        let mut shape = vec![rank];
        shape.extend_from_slice(size);
        let offsets = ImageArray::from_floats(offsets, shape.clone(), device)?;
        let smoothed = GaussianFilter::new(vec![sigma]).with_truncated(3.0).apply(&offsets)?;
        let field = ImageArray::new(smoothed.into_tensor().mul_scalar(magnitude as f32), shape)?;

        let grid = Grid::create(size, device)?.displace(&field)?;
        let (grid, affine) = self.rand_affine_grid.transform_grid(&grid, &centre_of(size))?;
        Ok((
            grid,
            ElasticDraw {
                magnitude,
                sigma: Some(sigma),
                affine,
            },
        ))
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, Float, ElasticDraw>> {
        let input = image.spatial_shape();
        check_rank(3, input.len())?;
        let size = fall_back_size(self.spatial_size.as_deref(), input)?;
        let device = image.device();

        let (grid, draw) = if self.gate.draw(&mut self.rng) {
            let (grid, draw) = self.deformed_grid::<B>(&size, &device)?;
            (grid, Some(draw))
        } else {
            (Grid::create(&size, &device)?, None)
        };
        let grid = grid.translate(&centre_shift(input, &size))?;
        let array = self.resampler.apply(image, Some(&grid))?;
        Ok(Sampled { array, draw })
    }
}

impl Randomizable for Rand3DElastic {
    fn set_random_state(&mut self, seed: u64) {
        let mut rng = rng_from_seed(Some(seed));
        self.rand_affine_grid.set_random_state(rng.gen());
        self.rng = rng;
    }
}
