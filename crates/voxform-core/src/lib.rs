pub mod error;
pub mod filter;
pub mod image;
pub mod interpolation;
pub mod spatial;

pub use error::{Result, TransformError};
pub use filter::{GaussianFilter, Resampler};
pub use image::{ArrayKind, Grid, ImageArray, IndexMap};
pub use interpolation::{GridSampleMode, GridSamplePadMode, InterpolateMode, NumpyPadMode};
pub use spatial::AffineParams;
