pub mod croppad;
pub mod gaussian;
pub mod resample;

pub use croppad::{center_crop, spatial_crop, spatial_pad};
pub use gaussian::GaussianFilter;
pub use resample::Resampler;
