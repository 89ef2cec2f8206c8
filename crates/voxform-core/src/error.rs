//! Error types for spatial transform operations.
//!
//! Every operator is all-or-nothing: a call either returns a complete result
//! or one of these errors, never a partially transformed array.

use thiserror::Error;

/// Main error type for array, grid and transform operations.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Spatial rank is zero or disagrees with another input.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Shape mismatch between two inputs.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A required input (grid, size, affine) was not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Invalid operator configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Unknown interpolation or padding mode string.
    #[error("Unsupported mode '{value}', expected one of {options:?}")]
    UnsupportedMode {
        value: String,
        options: &'static [&'static str],
    },

    /// Singular or otherwise unusable matrix.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Tensor data could not be read back to the host.
    #[error("Tensor data error: {0}")]
    Data(String),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

impl TransformError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create a missing input error.
    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a numerical error.
    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    /// Create a tensor data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::dimension_mismatch("spatial rank must be positive");
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: spatial rank must be positive"
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let err = TransformError::shape_mismatch(&[3, 4, 4], &[2, 4, 4]);
        let err_str = err.to_string();
        assert!(err_str.contains("expected"));
        assert!(err_str.contains("got"));
    }

    #[test]
    fn test_unsupported_mode() {
        let err = TransformError::UnsupportedMode {
            value: "cubic".to_string(),
            options: &["nearest", "bilinear"],
        };
        assert!(matches!(err, TransformError::UnsupportedMode { .. }));
        assert!(err.to_string().contains("cubic"));
    }
}
