use burn::tensor::backend::Backend;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use voxform_core::{ArrayKind, ImageArray, Result, TransformError};

use super::DEFAULT_PROB;
use crate::random::{rng_from_seed, ProbabilityGate, Randomizable, Sampled};
use crate::spatial::Rotate90;

/// Rotate by a random number of quarter turns, drawn from `1..=max_k`.
///
/// The realized draw is `k`.
#[derive(Debug, Clone)]
pub struct RandRotate90 {
    gate: ProbabilityGate,
    max_k: u32,
    spatial_axes: (isize, isize),
    rng: ChaCha8Rng,
}

impl Default for RandRotate90 {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl RandRotate90 {
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            max_k: 3,
            spatial_axes: (0, 1),
            rng: rng_from_seed(None),
        }
    }

    /// Largest number of quarter turns. Must be at least 1.
    pub fn with_max_k(mut self, max_k: u32) -> Self {
        self.max_k = max_k;
        self
    }

    pub fn with_spatial_axes(mut self, a: isize, b: isize) -> Self {
        self.spatial_axes = (a, b);
        self
    }

    fn randomize(&mut self) -> Result<Option<i64>> {
        if self.max_k == 0 {
            return Err(TransformError::invalid_configuration("max_k must be at least 1"));
        }
        if !self.gate.draw(&mut self.rng) {
            return Ok(None);
        }
        Ok(Some(i64::from(self.rng.gen_range(0..self.max_k)) + 1))
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, K, i64>> {
        let Some(k) = self.randomize()? else {
            return Ok(Sampled::skipped(image.clone()));
        };
        let rotate = Rotate90::new(k).with_spatial_axes(self.spatial_axes.0, self.spatial_axes.1);
        Ok(Sampled::applied(rotate.apply(image)?, k))
    }
}

impl Randomizable for RandRotate90 {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}
