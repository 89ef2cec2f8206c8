//! Interpolation and padding modes.
//!
//! Every mode parses from its lowercase name with a strict lookup: unknown
//! names are rejected with `TransformError::UnsupportedMode` instead of
//! silently falling back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Accepted names, in declaration order.
            pub const OPTIONS: &'static [&'static str] = &[$($text),+];

            /// Lowercase name of the mode.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = TransformError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(TransformError::UnsupportedMode {
                        value: s.to_string(),
                        options: Self::OPTIONS,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Sampling rule for grid resampling.
    pub enum GridSampleMode {
        /// Value of the closest voxel.
        Nearest => "nearest",
        /// N-linear blend of the surrounding voxels.
        Bilinear => "bilinear",
    }
}

string_enum! {
    /// Boundary rule for grid samples outside the input.
    pub enum GridSamplePadMode {
        /// Out-of-range neighbours contribute zero.
        Zeros => "zeros",
        /// Coordinates are clamped to the border voxels.
        Border => "border",
        /// Coordinates are reflected at the image boundary.
        Reflection => "reflection",
    }
}

string_enum! {
    /// Resize rule for separable interpolation.
    pub enum InterpolateMode {
        Nearest => "nearest",
        Linear => "linear",
        Bilinear => "bilinear",
        Bicubic => "bicubic",
        Trilinear => "trilinear",
        /// Adaptive average over the covered input voxels.
        Area => "area",
    }
}

string_enum! {
    /// Array padding rule used after zooming.
    pub enum NumpyPadMode {
        /// Pad with zeros.
        Constant => "constant",
        /// Repeat the edge voxel.
        Edge => "edge",
        /// Mirror without repeating the edge voxel.
        Reflect => "reflect",
        /// Mirror including the edge voxel.
        Symmetric => "symmetric",
        /// Wrap around to the opposite edge.
        Wrap => "wrap",
    }
}

impl Default for GridSampleMode {
    fn default() -> Self {
        Self::Bilinear
    }
}

impl Default for GridSamplePadMode {
    fn default() -> Self {
        Self::Border
    }
}

impl Default for InterpolateMode {
    fn default() -> Self {
        Self::Area
    }
}

impl Default for NumpyPadMode {
    fn default() -> Self {
        Self::Edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("nearest".parse::<GridSampleMode>().unwrap(), GridSampleMode::Nearest);
        assert_eq!(
            "reflection".parse::<GridSamplePadMode>().unwrap(),
            GridSamplePadMode::Reflection
        );
        assert_eq!("area".parse::<InterpolateMode>().unwrap(), InterpolateMode::Area);
        assert_eq!("wrap".parse::<NumpyPadMode>().unwrap(), NumpyPadMode::Wrap);
    }

    #[test]
    fn test_strict_lookup() {
        let err = "Bilinear".parse::<GridSampleMode>().unwrap_err();
        match err {
            TransformError::UnsupportedMode { value, options } => {
                assert_eq!(value, "Bilinear");
                assert_eq!(options, &["nearest", "bilinear"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_matches_parse() {
        for name in InterpolateMode::OPTIONS {
            let mode: InterpolateMode = name.parse().unwrap();
            assert_eq!(mode.to_string(), *name);
        }
    }
}
