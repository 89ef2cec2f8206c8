//! Random sources and probability gates for randomized operators.
//!
//! Every randomized operator owns a [`ChaCha8Rng`] and a [`ProbabilityGate`].
//! A call draws the gate first and only draws operator parameters when the
//! gate fires, so a seeded operator replays the same sequence of decisions.

use burn::tensor::backend::Backend;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use voxform_core::{ArrayKind, ImageArray};

/// Random number generator with optional seeding for reproducibility.
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Uniform draw in `[lo, hi)`. Degenerate and reversed ranges are valid.
pub fn uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.gen::<f64>()
}

/// Bernoulli gate deciding whether a randomized operator applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityGate {
    prob: f64,
}

impl ProbabilityGate {
    /// Create a gate firing with probability `prob`, clamped to `[0, 1]`.
    pub fn new(prob: f64) -> Self {
        Self {
            prob: prob.clamp(0.0, 1.0),
        }
    }

    pub fn prob(&self) -> f64 {
        self.prob
    }

    /// Draw once from `rng`.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.prob
    }
}

/// Range a scalar parameter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRange {
    /// `[-x, x]`
    Symmetric(f64),
    /// `[min, max]`
    Interval(f64, f64),
}

impl ParamRange {
    /// Lower and upper bound, lower first.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Symmetric(x) => {
                let x = x.abs();
                (-x, x)
            }
            Self::Interval(lo, hi) => (lo, hi),
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let (lo, hi) = self.bounds();
        uniform(rng, lo, hi)
    }
}

impl Default for ParamRange {
    fn default() -> Self {
        Self::Symmetric(0.0)
    }
}

impl From<f64> for ParamRange {
    fn from(x: f64) -> Self {
        Self::Symmetric(x)
    }
}

impl From<(f64, f64)> for ParamRange {
    fn from((lo, hi): (f64, f64)) -> Self {
        Self::Interval(lo, hi)
    }
}

/// Operators owning a reseedable random source.
pub trait Randomizable: Sized {
    /// Reseed every random source of the operator.
    fn set_random_state(&mut self, seed: u64);

    /// Builder form of [`Randomizable::set_random_state`].
    fn seeded(mut self, seed: u64) -> Self {
        self.set_random_state(seed);
        self
    }
}

/// Output of a randomized operator.
///
/// `draw` holds the realized parameters and is `None` when the gate did not
/// fire.
pub struct Sampled<B: Backend, K: ArrayKind<B> = burn::tensor::Float, D = ()> {
    pub array: ImageArray<B, K>,
    pub draw: Option<D>,
}

impl<B: Backend, K: ArrayKind<B>, D> Sampled<B, K, D> {
    /// Output for a gate that did not fire.
    pub fn skipped(array: ImageArray<B, K>) -> Self {
        Self { array, draw: None }
    }

    pub fn applied(array: ImageArray<B, K>, draw: D) -> Self {
        Self {
            array,
            draw: Some(draw),
        }
    }

    /// Whether the operator was applied.
    pub fn is_applied(&self) -> bool {
        self.draw.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_extremes() {
        let mut rng = rng_from_seed(Some(0));
        let never = ProbabilityGate::new(-1.0);
        let always = ProbabilityGate::new(2.0);
        assert_eq!(never.prob(), 0.0);
        assert_eq!(always.prob(), 1.0);
        for _ in 0..100 {
            assert!(!never.draw(&mut rng));
            assert!(always.draw(&mut rng));
        }
    }

    #[test]
    fn test_param_range_bounds() {
        let mut rng = rng_from_seed(Some(7));
        for _ in 0..100 {
            let v = ParamRange::Symmetric(0.5).sample(&mut rng);
            assert!((-0.5..0.5).contains(&v));
            let w = ParamRange::Interval(2.0, 3.0).sample(&mut rng);
            assert!((2.0..3.0).contains(&w));
        }
        assert_eq!(ParamRange::Interval(1.0, 1.0).sample(&mut rng), 1.0);
    }

    #[test]
    fn test_seeded_streams_replay() {
        let mut a = rng_from_seed(Some(42));
        let mut b = rng_from_seed(Some(42));
        for _ in 0..10 {
            assert_eq!(uniform(&mut a, -1.0, 1.0), uniform(&mut b, -1.0, 1.0));
        }
    }

    #[test]
    fn test_param_range_from() {
        assert_eq!(ParamRange::from(0.5), ParamRange::Symmetric(0.5));
        assert_eq!(ParamRange::from((0.0, 3.0)), ParamRange::Interval(0.0, 3.0));
        assert_eq!(ParamRange::Symmetric(-2.0).bounds(), (-2.0, 2.0));
    }
}
