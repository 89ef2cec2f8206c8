use burn::tensor::backend::Backend;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use voxform_core::image::index::numel;
use voxform_core::{Grid, ImageArray, Result, TransformError};

use crate::random::{rng_from_seed, uniform, Randomizable};
use crate::spatial::expand_to_rank;

/// Control-point grid with random Gaussian offsets.
///
/// The control grid has points `spacing` voxels apart. Every point moves by
/// `magnitude * N(0, 1)` along each axis, with `magnitude` drawn uniformly
/// from `magnitude_range` once per call.
#[derive(Debug, Clone)]
pub struct RandDeformGrid {
    spacing: Vec<f64>,
    magnitude_range: (f64, f64),
    rng: ChaCha8Rng,
}

/// Deformed control grid and the magnitude that produced it.
#[derive(Debug, Clone)]
pub struct DeformedGrid<B: Backend> {
    pub grid: Grid<B>,
    pub magnitude: f64,
}

impl RandDeformGrid {
    /// # Arguments
    /// * `spacing` - Control point distance per axis, or one for all axes.
    ///   Non-positive entries become 1.
    /// * `magnitude_range` - Bounds of the offset scale
    pub fn new(spacing: Vec<f64>, magnitude_range: (f64, f64)) -> Self {
        Self {
            spacing,
            magnitude_range,
            rng: rng_from_seed(None),
        }
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Control spacing resolved for `rank` spatial axes.
    pub fn resolved_spacing(&self, rank: usize) -> Result<Vec<f64>> {
        if self.spacing.is_empty() {
            return Err(TransformError::invalid_configuration("control spacing is empty"));
        }
        Ok(expand_to_rank(&self.spacing, rank, "control spacing")?
            .into_iter()
            .map(|s| if s > 0.0 { s } else { 1.0 })
            .collect())
    }

    /// Draw a deformed control grid covering `spatial_size`.
    ///
    /// Offsets are drawn first, then the magnitude.
    pub fn apply<B: Backend>(&mut self, spatial_size: &[usize], device: &B::Device) -> Result<DeformedGrid<B>> {
        let rank = spatial_size.len();
        let spacing = self.resolved_spacing(rank)?;
        let control = Grid::<B>::create_control(spatial_size, &spacing, device)?;

        let count = rank * numel(control.spatial_shape());
        let offsets: Vec<f64> = (0..count)
            .map(|_| self.rng.sample::<f64, _>(StandardNormal))
            .collect();
        let magnitude = uniform(&mut self.rng, self.magnitude_range.0, self.magnitude_range.1);

        let mut shape = vec![rank];
        shape.extend_from_slice(control.spatial_shape());
        let offsets = ImageArray::from_floats(
            offsets.iter().map(|&o| (o * magnitude) as f32).collect(),
            shape,
            device,
        )?;
        Ok(DeformedGrid {
            grid: control.displace(&offsets)?,
            magnitude,
        })
    }
}

impl Randomizable for RandDeformGrid {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}
