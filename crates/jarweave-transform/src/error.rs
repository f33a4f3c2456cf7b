//! Pipeline error types

use jarweave_classfile::{ClassFileError, VerifyError};
use thiserror::Error;

/// Errors surfaced by the transform pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Class bytes could not be decoded
    #[error("Failed to decode class '{class}': {source}")]
    Decode {
        /// Class being decoded
        class: String,
        /// Codec failure
        source: ClassFileError,
    },

    /// A transformer failed while processing a class
    #[error("Transformer '{transformer}' failed on class '{class}': {source}")]
    Transform {
        /// Name of the failing transformer
        transformer: String,
        /// Class being transformed
        class: String,
        /// What went wrong
        source: TransformError,
    },

    /// No class source could provide the requested class
    #[error("The specified class '{0}' was not found")]
    NotFound(String),

    /// IO error (file or archive reads and writes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive container error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl PipelineError {
    /// Whether the failure only concerns a single class's bytes
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, PipelineError::Decode { .. })
    }
}

/// Errors a transformer reports from [`crate::Transformer::transform`]
#[derive(Debug, Error)]
pub enum TransformError {
    /// Transformer-specific failure
    #[error("{0}")]
    Failed(String),

    /// Transformer left the class structurally invalid
    #[error("Produced an invalid class: {0}")]
    Invalid(#[from] VerifyError),

    /// Transformed class could not be re-encoded
    #[error("Failed to encode transformed class: {0}")]
    Encode(#[from] ClassFileError),

    /// A class requested during the transform could not be provided
    #[error("Class lookup failed: {0}")]
    Lookup(Box<PipelineError>),

    /// Any other error raised by transformer code
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransformError {
    /// Create a transformer-specific failure
    pub fn failed(message: impl Into<String>) -> Self {
        TransformError::Failed(message.into())
    }
}

impl From<PipelineError> for TransformError {
    fn from(error: PipelineError) -> Self {
        TransformError::Lookup(Box::new(error))
    }
}
