use burn::tensor::backend::Backend;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use voxform_core::{ArrayKind, ImageArray, Result, TransformError};

use super::DEFAULT_PROB;
use crate::random::{rng_from_seed, ProbabilityGate, Randomizable, Sampled};
use crate::spatial::Flip;

/// Flip fixed spatial axes with probability `prob`.
#[derive(Debug, Clone)]
pub struct RandFlip {
    gate: ProbabilityGate,
    flip: Flip,
    rng: ChaCha8Rng,
}

impl Default for RandFlip {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl RandFlip {
    /// Flip every spatial axis when the gate fires.
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            flip: Flip::new(),
            rng: rng_from_seed(None),
        }
    }

    pub fn with_axes(mut self, axes: Vec<isize>) -> Self {
        self.flip = Flip::with_axes(axes);
        self
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(&mut self, image: &ImageArray<B, K>) -> Result<Sampled<B, K>> {
        if !self.gate.draw(&mut self.rng) {
            return Ok(Sampled::skipped(image.clone()));
        }
        Ok(Sampled::applied(self.flip.apply(image)?, ()))
    }
}

impl Randomizable for RandFlip {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}

/// Flip one spatial axis chosen uniformly at call time.
///
/// The realized draw is the flipped spatial axis.
#[derive(Debug, Clone)]
pub struct RandAxisFlip {
    gate: ProbabilityGate,
    rng: ChaCha8Rng,
}

impl Default for RandAxisFlip {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl RandAxisFlip {
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            rng: rng_from_seed(None),
        }
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, K, usize>> {
        let rank = image.spatial_rank();
        if rank == 0 {
            return Err(TransformError::dimension_mismatch(
                "axis flip needs at least one spatial axis",
            ));
        }
        if !self.gate.draw(&mut self.rng) {
            return Ok(Sampled::skipped(image.clone()));
        }
        let axis = self.rng.gen_range(0..rank);
        let flipped = Flip::with_axes(vec![axis as isize]).apply(image)?;
        Ok(Sampled::applied(flipped, axis))
    }
}

impl Randomizable for RandAxisFlip {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
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
    fn test_rand_flip_fixed_axes() {
        let mut op = RandFlip::new(1.0).with_axes(vec![1]).seeded(0);
        let out = op.apply(&labels()).unwrap();
        assert!(out.is_applied());
        assert_eq!(out.array.to_vec_i64().unwrap(), vec![2, 1, 0, 5, 4, 3]);

        let mut never = RandFlip::new(0.0);
        assert!(!never.apply(&labels()).unwrap().is_applied());
    }

    #[test]
    fn test_rand_axis_flip_matches_drawn_axis() {
        let mut op = RandAxisFlip::new(1.0).seeded(11);
        for _ in 0..10 {
            let out = op.apply(&labels()).unwrap();
            let axis = out.draw.unwrap();
            assert!(axis < 2);
            let expected = Flip::with_axes(vec![axis as isize]).apply(&labels()).unwrap();
            assert_eq!(out.array.to_vec_i64().unwrap(), expected.to_vec_i64().unwrap());
        }
    }
}
