//! Error kinds shared by the canvas, the map registry and style modules.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Out of range query: {0}")]
    OutOfRange(String),

    #[error("Execution failure: {0}")]
    ExecutionFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CanvasError {
    pub(crate) fn bad_index(what: &str, index: usize, len: usize) -> Self {
        CanvasError::Configuration(format!(
            "{} index {} out of bounds (len {})",
            what, index, len
        ))
    }
}
