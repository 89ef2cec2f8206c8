//! Affine resampling of whole images.

use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use voxform_core::spatial::create_translate;
use voxform_core::{
    AffineParams, ArrayKind, Grid, GridSampleMode, GridSamplePadMode, ImageArray, Resampler, Result,
};

use super::affine_grid::{AffineDraw, AffineGrid, AffineRanges, RandAffineGrid};
use crate::random::{rng_from_seed, ProbabilityGate, Randomizable};
use crate::randomized::DEFAULT_PROB;
use crate::spatial::{fall_back_size, is_static_size, Resampled};

/// Shift taking output voxel coordinates centred on the output grid to the
/// matching position centred on the input image.
pub(crate) fn centre_shift(input: &[usize], output: &[usize]) -> Vec<f64> {
    input
        .iter()
        .zip(output)
        .map(|(&i, &o)| (i as f64 - o as f64) / 2.0)
        .collect()
}

pub(crate) fn centre_of(size: &[usize]) -> Vec<f64> {
    size.iter().map(|&n| (n as f64 - 1.0) / 2.0).collect()
}

/// Resample an image through an affine transform about its centre.
///
/// The output size defaults to the input size. A smaller or larger output
/// with an identity transform is a centred crop or pad.
#[derive(Debug, Clone)]
pub struct Affine {
    affine_grid: AffineGrid,
    spatial_size: Option<Vec<i64>>,
    resampler: Resampler,
}

impl Affine {
    pub fn new(params: AffineParams) -> Self {
        Self::with_grid(AffineGrid::new(params))
    }

    /// Use a full `(D + 1) x (D + 1)` matrix instead of parameters.
    pub fn from_matrix(affine: DMatrix<f64>) -> Self {
        Self::with_grid(AffineGrid::from_matrix(affine))
    }

    fn with_grid(affine_grid: AffineGrid) -> Self {
        Self {
            affine_grid,
            spatial_size: None,
            resampler: Resampler::new()
                .with_padding_mode(GridSamplePadMode::Reflection)
                .with_align_corners(false),
        }
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

    /// Returns the resampled image and the voxel-to-voxel matrix from output
    /// to input coordinates.
    pub fn apply<B: Backend, K: ArrayKind<B>>(&self, image: &ImageArray<B, K>) -> Result<Resampled<B>> {
        let input = image.spatial_shape();
        let size = fall_back_size(self.spatial_size.as_deref(), input)?;
        let (grid, matrix) = self.affine_grid.apply::<B>(Some(&size), None, &image.device())?;
        let shift = centre_shift(input, &size);
        let grid = grid.translate(&shift)?;
        let array = self.resampler.apply(image, Some(&grid))?;
        let rank = input.len();
        let voxel_matrix = create_translate(rank, &centre_of(input))
            * matrix
            * create_translate(rank, &centre_of(&size).iter().map(|c| -c).collect::<Vec<_>>());
        Ok(Resampled {
            array,
            matrix: voxel_matrix,
        })
    }
}

/// Output of [`RandAffine`].
pub struct RandAffineOutput<B: Backend> {
    pub array: ImageArray<B>,
    /// Realized parameters, `None` when the gate did not fire.
    pub draw: Option<AffineDraw>,
    /// Whether the identity grid came from the cache.
    pub cache_used: bool,
}

/// Random affine resampling with probability `prob`.
///
/// When the gate does not fire and the output size equals the input size the
/// input is returned as float without resampling. An identity grid can be
/// cached when the output size is fixed.
#[derive(Debug, Clone)]
pub struct RandAffine<B: Backend> {
    gate: ProbabilityGate,
    rand_affine_grid: RandAffineGrid,
    spatial_size: Option<Vec<i64>>,
    resampler: Resampler,
    cache: Option<Grid<B>>,
    rng: ChaCha8Rng,
}

impl<B: Backend> Default for RandAffine<B> {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl<B: Backend> RandAffine<B> {
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            rand_affine_grid: RandAffineGrid::new(AffineRanges::default()),
            spatial_size: None,
            resampler: Resampler::new()
                .with_padding_mode(GridSamplePadMode::Reflection)
                .with_align_corners(false),
            cache: None,
            rng: rng_from_seed(None),
        }
    }

    pub fn with_ranges(mut self, ranges: AffineRanges) -> Self {
        self.rand_affine_grid = RandAffineGrid::new(ranges);
        self
    }

    /// Output spatial size. Non-positive entries keep the input size. Drops
    /// any cached grid.
    pub fn with_spatial_size(mut self, spatial_size: Vec<i64>) -> Self {
        self.spatial_size = Some(spatial_size);
        self.cache = None;
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

    /// Precompute the identity grid on `device`.
    ///
    /// Only a fully positive spatial size can be cached; otherwise the grid is
    /// rebuilt on every call and a warning is logged.
    pub fn with_cache_grid(mut self, device: &B::Device) -> Result<Self> {
        match self.spatial_size.as_deref() {
            Some(size) if is_static_size(Some(size)) => {
                let size: Vec<usize> = size.iter().map(|&s| s as usize).collect();
                self.cache = Some(Grid::create(&size, device)?);
            }
            _ => {
                warn!(
                    spatial_size = ?self.spatial_size,
                    "grid cache needs a fixed spatial size, building grids per call"
                );
                self.cache = None;
            }
        }
        Ok(self)
    }

    pub fn has_cached_grid(&self) -> bool {
        self.cache.is_some()
    }

    fn identity_grid(&self, size: &[usize], device: &B::Device) -> Result<(Grid<B>, bool)> {
        match &self.cache {
            Some(cached) if cached.spatial_shape() == size => {
                debug!(?size, "identity grid cache hit");
                Ok((cached.clone(), true))
            }
            Some(cached) => {
                debug!(?size, cached = ?cached.spatial_shape(), "identity grid cache miss");
                Ok((Grid::create(size, device)?, false))
            }
            None => Ok((Grid::create(size, device)?, false)),
        }
    }

    pub fn apply<K: ArrayKind<B>>(&mut self, image: &ImageArray<B, K>) -> Result<RandAffineOutput<B>> {
        let input = image.spatial_shape();
        let size = fall_back_size(self.spatial_size.as_deref(), input)?;
        let fired = self.gate.draw(&mut self.rng);
        if !fired && size == input {
            return Ok(RandAffineOutput {
                array: image.to_float(),
                draw: None,
                cache_used: false,
            });
        }

        let (grid, cache_used) = self.identity_grid(&size, &image.device())?;
        let (grid, draw) = if fired {
            let (grid, draw) = self.rand_affine_grid.transform_grid(&grid, &centre_of(&size))?;
            (grid, Some(draw))
        } else {
            (grid, None)
        };
        let grid = grid.translate(&centre_shift(input, &size))?;
        let array = self.resampler.apply(image, Some(&grid))?;
        Ok(RandAffineOutput {
            array,
            draw,
            cache_used,
        })
    }
}

impl<B: Backend> Randomizable for RandAffine<B> {
    fn set_random_state(&mut self, seed: u64) {
        let mut rng = rng_from_seed(Some(seed));
        self.rand_affine_grid.set_random_state(rng.gen());
        self.rng = rng;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ParamRange;
    use burn_ndarray::NdArray;
    use std::f64::consts::FRAC_PI_2;

    type TestBackend = NdArray<f32>;

    fn ramp(shape: Vec<usize>) -> ImageArray<TestBackend> {
        let n = shape.iter().product::<usize>();
        ImageArray::from_floats((0..n).map(|v| v as f32).collect(), shape, &Default::default()).unwrap()
    }

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn test_identity_params_reproduce_image() {
        let image = ramp(vec![1, 3, 4]);
        let out = Affine::new(AffineParams::default()).apply(&image).unwrap();
        assert_close(&out.array.to_vec_f32().unwrap(), &image.to_vec_f32().unwrap());
        assert_eq!(out.matrix, DMatrix::identity(3, 3));
    }

    #[test]
    fn test_quarter_turn_about_centre() {
        let params = AffineParams {
            rotate: vec![FRAC_PI_2],
            ..Default::default()
        };
        let out = Affine::new(params).apply(&ramp(vec![1, 3, 3])).unwrap();
        assert_close(
            &out.array.to_vec_f32().unwrap(),
            &[6.0, 3.0, 0.0, 7.0, 4.0, 1.0, 8.0, 5.0, 2.0],
        );
    }

    #[test]
    fn test_smaller_output_is_centre_crop() {
        let image = ramp(vec![1, 4, 4]);
        let out = Affine::new(AffineParams::default())
            .with_spatial_size(vec![2, -1])
            .apply(&image)
            .unwrap();
        assert_eq!(out.array.shape(), &[1, 2, 4]);
        assert_close(
            &out.array.to_vec_f32().unwrap(),
            &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0],
        );
    }

    #[test]
    fn test_matrix_override() {
        let mut flip = DMatrix::identity(3, 3);
        flip[(1, 1)] = -1.0;
        let out = Affine::from_matrix(flip).apply(&ramp(vec![1, 2, 3])).unwrap();
        assert_close(&out.array.to_vec_f32().unwrap(), &[2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_rand_affine_passthrough() {
        let image = ramp(vec![1, 3, 3]);
        let mut op = RandAffine::<TestBackend>::new(0.0).with_ranges(AffineRanges {
            rotate: vec![ParamRange::Symmetric(1.0)],
            ..Default::default()
        });
        let out = op.apply(&image).unwrap();
        assert!(out.draw.is_none());
        assert!(!out.cache_used);
        assert_eq!(out.array.to_vec_f32().unwrap(), image.to_vec_f32().unwrap());
    }

    #[test]
    fn test_rand_affine_cache() {
        let device = Default::default();
        let image = ramp(vec![1, 4, 4]);
        let mut op = RandAffine::<TestBackend>::new(1.0)
            .with_spatial_size(vec![3, 3])
            .with_cache_grid(&device)
            .unwrap()
            .seeded(1);
        assert!(op.has_cached_grid());
        let out = op.apply(&image).unwrap();
        assert!(out.cache_used);
        assert!(out.draw.is_some());
        assert_eq!(out.array.shape(), &[1, 3, 3]);

        let dynamic = RandAffine::<TestBackend>::new(1.0)
            .with_spatial_size(vec![3, -1])
            .with_cache_grid(&device)
            .unwrap();
        assert!(!dynamic.has_cached_grid());
    }

    #[test]
    fn test_rand_affine_gate_closed_with_resize_crops() {
        let image = ramp(vec![1, 4, 4]);
        let mut op = RandAffine::<TestBackend>::new(0.0).with_spatial_size(vec![2, 2]);
        let out = op.apply(&image).unwrap();
        assert!(out.draw.is_none());
        assert_close(&out.array.to_vec_f32().unwrap(), &[5.0, 6.0, 9.0, 10.0]);
    }
}
