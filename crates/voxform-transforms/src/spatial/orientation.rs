//! Reorientation by axis permutation and flips.

use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;
use voxform_core::spatial::{
    axcodes_to_orientation, embed_affine, inverse_orientation_affine, io_orientation, orientation_index_map,
    orientation_transform, to_affine_nd, DEFAULT_LABELS,
};
use voxform_core::{ArrayKind, ImageArray, Result, TransformError};

use super::AffineOutput;

/// Reorient an array so its voxel axes follow target axis codes.
///
/// The source orientation is inferred from the voxel-to-world affine. The
/// array is only permuted and flipped, so values and kind are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    axcodes: Option<String>,
    as_closest_canonical: bool,
    labels: Vec<(char, char)>,
}

impl Orientation {
    /// Reorient to `axcodes`, e.g. `"RAS"`, one code per spatial axis.
    pub fn new(axcodes: impl Into<String>) -> Self {
        Self {
            axcodes: Some(axcodes.into()),
            as_closest_canonical: false,
            labels: DEFAULT_LABELS.to_vec(),
        }
    }

    /// Reorient to the canonical orientation closest to the affine.
    pub fn closest_canonical() -> Self {
        Self {
            axcodes: None,
            as_closest_canonical: true,
            labels: DEFAULT_LABELS.to_vec(),
        }
    }

    /// Switch closest-canonical mode on or off. Axis codes are ignored while
    /// it is on.
    pub fn with_closest_canonical(mut self, as_closest_canonical: bool) -> Self {
        self.as_closest_canonical = as_closest_canonical;
        self
    }

    /// Replace the `(begin, end)` label pair of each world axis.
    pub fn with_labels(mut self, labels: Vec<(char, char)>) -> Self {
        self.labels = labels;
        self
    }

    pub fn axcodes(&self) -> Option<&str> {
        self.axcodes.as_deref()
    }

    /// Reorient `image` with voxel-to-world `affine` (identity if `None`).
    ///
    /// # Errors
    /// * `InvalidConfiguration` with neither axis codes nor closest-canonical
    ///   mode, or for codes missing from the labels
    /// * `DimensionMismatch` when the codes do not name every spatial axis
    pub fn apply<B: Backend, K: ArrayKind<B>>(
        &self,
        image: &ImageArray<B, K>,
        affine: Option<&DMatrix<f64>>,
    ) -> Result<AffineOutput<B, K>> {
        let sr = image.spatial_rank();
        if sr == 0 {
            return Err(TransformError::dimension_mismatch(
                "reorientation needs at least one spatial axis",
            ));
        }
        let original_affine = affine
            .cloned()
            .unwrap_or_else(|| DMatrix::identity(sr + 1, sr + 1));
        let affine_ = to_affine_nd(sr, &original_affine)?;
        let src = io_orientation(&affine_)?;

        let spatial_ornt = if self.as_closest_canonical {
            if let Some(axcodes) = &self.axcodes {
                warn!(axcodes = %axcodes, "axis codes are ignored in closest-canonical mode");
            }
            src
        } else {
            let Some(axcodes) = &self.axcodes else {
                return Err(TransformError::invalid_configuration(
                    "either axis codes or closest-canonical mode is required",
                ));
            };
            let dst = axcodes_to_orientation(axcodes, &self.labels)?;
            if dst.len() != sr {
                return Err(TransformError::dimension_mismatch(format!(
                    "axis codes '{}' name {} axes, the image has {} spatial axes",
                    axcodes,
                    dst.len(),
                    sr
                )));
            }
            orientation_transform(&src, &dst)?
        };

        let map = orientation_index_map(&spatial_ornt, image.spatial_shape())?;
        let array = image.remap(&map)?;
        let new_affine = &affine_ * inverse_orientation_affine(&spatial_ornt, image.spatial_shape())?;
        let affine = embed_affine(&original_affine, &new_affine)?;
        Ok(AffineOutput {
            array,
            original_affine,
            affine,
        })
    }
}
