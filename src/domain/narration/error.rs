use crate::error::AppError;
use crate::infrastructure::storage::StorageError;

/// Failures of the narration pipeline.
///
/// Running out of execution budget is not represented here: it is the
/// `Checkpointed` outcome of an invocation.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<NarrationError> for AppError {
    fn from(err: NarrationError) -> Self {
        match err {
            NarrationError::Extraction(msg) => AppError::UnprocessableEntity(msg),
            NarrationError::Synthesis(msg) => AppError::ExternalService(msg),
            NarrationError::Storage(e) => AppError::Storage(e),
            NarrationError::InvariantViolation(msg) => AppError::Internal(msg),
            NarrationError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
