//! Error types for vollseg-core
//!
//! Provides a unified error type for all operations in the core crate.
//! Each variant captures enough context for diagnostics without exposing
//! internal implementation details.

use thiserror::Error;

/// vollseg core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Two arrays that must share a shape do not
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Array has zero axes or a zero-length axis where that is not allowed
    #[error("invalid array shape: {0:?}")]
    InvalidShape(Vec<usize>),

    /// Point has the wrong number of coordinates for the array
    #[error("dimension mismatch: expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// ndarray rejected a shape/data combination
    #[error("array layout error: {0}")]
    Layout(#[from] ndarray::ShapeError),
}

/// Result type alias for vollseg core operations
pub type Result<T> = std::result::Result<T, Error>;
