use burn::tensor::backend::Backend;
use burn::tensor::Float;
use nalgebra::DMatrix;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use voxform_core::{ArrayKind, GridSampleMode, GridSamplePadMode, ImageArray, Result, TransformError};

use super::DEFAULT_PROB;
use crate::random::{rng_from_seed, ParamRange, ProbabilityGate, Randomizable, Sampled};
use crate::spatial::Rotate;

/// Realized parameters of one [`RandRotate`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateDraw {
    /// Angles in radians: one in 2D, three in 3D.
    pub angles: Vec<f64>,
    /// Voxel-to-voxel matrix mapping output to input coordinates.
    pub matrix: DMatrix<f64>,
}

/// Rotate by random angles drawn per axis.
///
/// 2D images use the angle drawn from `range_x`; 3D images use one angle per
/// range. All three angles are drawn on every firing call.
#[derive(Debug, Clone)]
pub struct RandRotate {
    gate: ProbabilityGate,
    range_x: ParamRange,
    range_y: ParamRange,
    range_z: ParamRange,
    keep_size: bool,
    mode: GridSampleMode,
    padding_mode: GridSamplePadMode,
    align_corners: bool,
    rng: ChaCha8Rng,
}

impl Default for RandRotate {
    fn default() -> Self {
        Self::new(DEFAULT_PROB)
    }
}

impl RandRotate {
    /// Operator with zero angle ranges; set them with the range builders.
    pub fn new(prob: f64) -> Self {
        Self {
            gate: ProbabilityGate::new(prob),
            range_x: ParamRange::default(),
            range_y: ParamRange::default(),
            range_z: ParamRange::default(),
            keep_size: true,
            mode: GridSampleMode::Bilinear,
            padding_mode: GridSamplePadMode::Border,
            align_corners: false,
            rng: rng_from_seed(None),
        }
    }

    pub fn with_range_x(mut self, range: impl Into<ParamRange>) -> Self {
        self.range_x = range.into();
        self
    }

    pub fn with_range_y(mut self, range: impl Into<ParamRange>) -> Self {
        self.range_y = range.into();
        self
    }

    pub fn with_range_z(mut self, range: impl Into<ParamRange>) -> Self {
        self.range_z = range.into();
        self
    }

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

    fn randomize(&mut self) -> Option<[f64; 3]> {
        if !self.gate.draw(&mut self.rng) {
            return None;
        }
        let x = self.range_x.sample(&mut self.rng);
        let y = self.range_y.sample(&mut self.rng);
        let z = self.range_z.sample(&mut self.rng);
        Some([x, y, z])
    }

    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &mut self,
        image: &ImageArray<B, K>,
    ) -> Result<Sampled<B, Float, RotateDraw>> {
        let rank = image.spatial_rank();
        if rank != 2 && rank != 3 {
            return Err(TransformError::dimension_mismatch(format!(
                "rotation needs 2 or 3 spatial axes, got {}",
                rank
            )));
        }
        let Some(drawn) = self.randomize() else {
            return Ok(Sampled::skipped(image.to_float()));
        };
        let angles = if rank == 2 { vec![drawn[0]] } else { drawn.to_vec() };
        let rotated = Rotate::new(angles.clone())
            .with_keep_size(self.keep_size)
            .with_mode(self.mode)
            .with_padding_mode(self.padding_mode)
            .with_align_corners(self.align_corners)
            .apply(image)?;
        Ok(Sampled::applied(
            rotated.array,
            RotateDraw {
                angles,
                matrix: rotated.matrix,
            },
        ))
    }
}

impl Randomizable for RandRotate {
    fn set_random_state(&mut self, seed: u64) {
        self.rng = rng_from_seed(Some(seed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn ramp() -> ImageArray<TestBackend> {
        ImageArray::from_floats((0..16).map(|v| v as f32).collect(), vec![1, 4, 4], &Default::default())
            .unwrap()
    }

    #[test]
    fn test_angle_within_range() {
        let mut op = RandRotate::new(1.0).with_range_x((0.2, 0.4)).seeded(5);
        for _ in 0..10 {
            let draw = op.apply(&ramp()).unwrap().draw.unwrap();
            assert_eq!(draw.angles.len(), 1);
            assert!((0.2..0.4).contains(&draw.angles[0]));
        }
    }

    #[test]
    fn test_three_angles_in_3d() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 3, 3, 3], &Default::default()).unwrap();
        let mut op = RandRotate::new(1.0).with_range_x(0.1).with_range_z(0.3).seeded(1);
        let draw = op.apply(&image).unwrap().draw.unwrap();
        assert_eq!(draw.angles.len(), 3);
        assert_eq!(draw.angles[1], 0.0);
        assert!(draw.angles[2].abs() < 0.3);
    }

    #[test]
    fn test_skipped_call_is_float_copy() {
        let mut op = RandRotate::new(0.0).with_range_x(1.0);
        let out = op.apply(&ramp()).unwrap();
        assert!(out.draw.is_none());
        assert_eq!(out.array.to_vec_f32().unwrap(), ramp().to_vec_f32().unwrap());
    }

    #[test]
    fn test_rejects_1d() {
        let image = ImageArray::<TestBackend>::zeros(vec![1, 4], &Default::default()).unwrap();
        assert!(RandRotate::new(1.0).apply(&image).is_err());
    }
}
