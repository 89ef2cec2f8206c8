//! Spatial transforms for channel-first medical images.
//!
//! Deterministic operators live in [`spatial`], their randomized wrappers in
//! [`randomized`], and grid-based affine and elastic operators in
//! [`composite`]. All of them work on [`voxform_core::ImageArray`] for any
//! burn backend.

pub mod composite;
pub mod random;
pub mod randomized;
pub mod spatial;

pub use composite::{
    Affine, AffineDraw, AffineGrid, AffineRanges, ElasticDraw, Rand2DElastic, Rand3DElastic, RandAffine,
    RandAffineGrid, RandAffineOutput, RandDeformGrid,
};
pub use random::{ParamRange, ProbabilityGate, Randomizable, Sampled};
pub use randomized::{RandAxisFlip, RandFlip, RandRotate, RandRotate90, RandZoom, RotateDraw};
pub use spatial::{
    AddCoordinateChannels, AffineOutput, Flip, Orientation, Resampled, Resize, Rotate, Rotate90, SizeMode,
    Spacing, Zoom,
};
