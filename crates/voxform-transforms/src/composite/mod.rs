//! Operators combining grid generation and resampling.

pub mod affine;
pub mod affine_grid;
pub mod deform_grid;
pub mod elastic;

pub use affine::{Affine, RandAffine, RandAffineOutput};
pub use affine_grid::{AffineDraw, AffineGrid, AffineRanges, RandAffineGrid};
pub use deform_grid::{DeformedGrid, RandDeformGrid};
pub use elastic::{ElasticDraw, Rand2DElastic, Rand3DElastic};
