//! Image arrays and coordinate grids.
//!
//! This module provides the channel-first `ImageArray`, host-side index maps
//! for exact re-indexing, and the homogeneous `Grid` used for resampling.

pub mod array;
pub mod grid;
pub mod index;

pub use array::{ArrayKind, ImageArray};
pub use grid::{control_grid_size, Grid};
pub use index::IndexMap;
