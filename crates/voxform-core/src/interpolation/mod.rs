//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates, normalized grid sampling
//! and separable resizing.

pub mod grid_sample;
pub mod linear;
pub mod mode;
pub mod nearest;
pub mod resize;
pub mod trait_;

pub use grid_sample::{grid_sample, normalize_coordinates, unnormalize_coordinates};
pub use linear::LinearInterpolator;
pub use mode::{GridSampleMode, GridSamplePadMode, InterpolateMode, NumpyPadMode};
pub use nearest::NearestNeighborInterpolator;
pub use resize::interpolate;
pub use trait_::Interpolator;
