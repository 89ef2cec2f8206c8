//! Affine and coordinate-system math.
//!
//! This module provides elementary homogeneous matrices, spacing arithmetic
//! on voxel-to-world affines, and axis orientation inference.
//! All matrices are nalgebra `DMatrix<f64>` so the spatial rank is a runtime
//! value.

pub mod affine;
pub mod orientation;
pub mod spacing;

pub use affine::{about_point, create_rotate, create_scale, create_shear, create_translate, AffineParams};
pub use orientation::{
    axcodes_to_orientation, inverse_orientation_affine, io_orientation, orientation_index_map,
    orientation_to_axcodes, orientation_transform, AxisOrientation, DEFAULT_LABELS,
};
pub use spacing::{affine_spacing, allclose, compute_shape_offset, embed_affine, to_affine_nd, zoom_affine};
