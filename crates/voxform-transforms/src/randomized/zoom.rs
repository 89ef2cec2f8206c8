use burn::tensor::backend::Backend;
use burn::tensor::Float;
use rand_chacha::ChaCha8Rng;
use voxform_core::{ArrayKind, ImageArray, InterpolateMode, NumpyPadMode, Result, TransformError};

use super::DEFAULT_PROB;
use crate::random::{rng_from_seed, uniform, ProbabilityGate, Randomizable, Sampled};
use crate::spatial::Zoom;

/// Zoom by factors drawn uniformly from `[min_zoom, max_zoom]`.
///
/// One factor per entry is drawn. A single factor applies to every axis. Two
/// factors on a volume apply the first to all but the last axis and the
/// second to the last axis. The realized draw is the per-axis zoom.
#[derive(Debug, Clone)]
pub struct RandZoom {
    gate: ProbabilityGate,
    min_zoom: Vec<f64>,
    max_zoom: Vec<f64>,
    mode: InterpolateMode,
    padding_mode: NumpyPadMode,
    align_corners: Option<bool>,
    keep_size: bool,
    rng: ChaCha8Rng,
}

impl Default for RandZoom {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl RandZoom {
    /// Operator zooming in `[0.9, 1.1]` on every axis.
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            min_zoom: vec![0.9],
            max_zoom: vec![1.1],
            mode: InterpolateMode::Area,
            padding_mode: NumpyPadMode::Edge,
            align_corners: None,
            keep_size: true,
            rng: rng_from_seed(None),
        }
    }

    /// Set the bounds; both lists need the same length.
    pub fn with_range(mut self, min_zoom: Vec<f64>, max_zoom: Vec<f64>) -> Result<Self> {
        if min_zoom.len() != max_zoom.len() {
            return Err(TransformError::invalid_configuration(format!(
                "min_zoom has {} entries and max_zoom {}",
                min_zoom.len(),
                max_zoom.len()
            )));
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: InterpolateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_padding_mode(mut self, padding_mode: NumpyPadMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    pub fn with_align_corners(mut self, align_corners: Option<bool>) -> Self {
        self.align_corners = align_corners;
        self
    }

    pub fn with_keep_size(mut self, keep_size: bool) -> Self {
        self.keep_size = keep_size;
        self
    }

    fn randomize(&mut self) -> Result<Option<Vec<f64>>> {
        if !self.gate.draw(&mut self.rng) {
            return Ok(None);
        }
        let rng = &mut self.rng;
        Ok(Some(
            self.min_zoom
                .iter()
                .zip(&self.max_zoom)
                .map(|(&lo, &hi)| uniform(rng, lo, hi))
                .collect(),
        ))
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, Float, Vec<f64>>> {
        let Some(drawn) = self.randomize()? else {
            return Ok(Sampled::skipped(image.to_float()));
        };
        let rank = image.spatial_rank();
        let zoom = match drawn.as_slice() {
            [z] => vec![*z; rank],
            [inplane, depth] if rank > 2 => {
                let mut zoom = vec![*inplane; rank - 1];
                zoom.push(*depth);
                zoom
            }
            _ => drawn,
        };
        let zoomed = Zoom::new(zoom.clone())
            .with_mode(self.mode)
            .with_padding_mode(self.padding_mode)
            .with_align_corners(self.align_corners)
            .with_keep_size(self.keep_size)
            .apply(image)?;
        Ok(Sampled::applied(zoomed, zoom))
    }
}

impl Randomizable for RandZoom {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_single_factor_broadcast() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 4, 6], &Default::default()).unwrap();
        let mut op = RandZoom::new(1.0).with_range(vec![0.5], vec![0.8]).unwrap().seeded(2);
        let out = op.apply(&image).unwrap();
        let zoom = out.draw.unwrap();
        assert_eq!(zoom.len(), 2);
        assert_eq!(zoom[0], zoom[1]);
        assert!((0.5..0.8).contains(&zoom[0]));
        assert_eq!(out.array.shape(), &[1, 4, 6]);
    }

    #[test]
    fn test_two_factors_on_volume() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 4, 4, 4], &Default::default()).unwrap();
        let mut op = RandZoom::new(1.0)
            .with_range(vec![1.0, 2.0], vec![1.0, 2.0])
            .unwrap()
            .with_keep_size(false)
            .seeded(0);
        let out = op.apply(&image).unwrap();
        assert_eq!(out.draw.unwrap(), vec![1.0, 1.0, 2.0]);
        assert_eq!(out.array.shape(), &[1, 4, 4, 8]);
    }

    #[test]
    fn test_mismatched_bounds_rejected() {
        let result = RandZoom::new(1.0).with_range(vec![0.9, 0.9], vec![1.1]);
        assert!(matches!(result, Err(TransformError::InvalidConfiguration(_))));
    }
}
