//! Error types for vollseg-region

use thiserror::Error;

/// Errors that can occur during region processing operations
#[derive(Debug, Error)]
pub enum RegionError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] vollseg_core::Error),

    /// Morphology error
    #[error("morphology error: {0}")]
    Morph(#[from] vollseg_morph::MorphError),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Ran out of label ids
    #[error("label id space exhausted")]
    LabelOverflow,
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;
