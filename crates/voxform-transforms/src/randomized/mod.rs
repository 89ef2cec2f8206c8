//! Randomized wrappers around the deterministic spatial operators.
//!
//! Every operator here draws its probability gate first and only draws its
//! parameters when the gate fires. A call that does not fire returns the
//! input, cast to float for interpolating operators.

pub mod flip;
pub mod rotate;
pub mod rotate90;
pub mod zoom;

pub use flip::{RandAxisFlip, RandFlip};
pub use rotate::{RandRotate, RotateDraw};
pub use rotate90::RandRotate90;
pub use zoom::RandZoom;

/// Default firing probability of the randomized spatial operators.
pub const DEFAULT_PROB: f64 = 0.1;
