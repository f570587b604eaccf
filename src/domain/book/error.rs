use crate::domain::narration::NarrationError;
use crate::error::AppError;
use crate::infrastructure::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum BookServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("book not found")]
    NotFound,
    #[error("only the owner may {0}")]
    Forbidden(&'static str),
    #[error("audio not yet available")]
    AudioUnavailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Narration(#[from] NarrationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AppError> for BookServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => BookServiceError::Invalid(msg),
            AppError::NotFound(_) => BookServiceError::NotFound,
            AppError::Storage(e) => BookServiceError::Storage(e),
            _ => BookServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<BookServiceError> for AppError {
    fn from(err: BookServiceError) -> Self {
        match err {
            BookServiceError::Invalid(msg) => AppError::BadRequest(msg),
            BookServiceError::NotFound => AppError::NotFound("Book not found".to_string()),
            BookServiceError::Forbidden(action) => {
                AppError::Forbidden(format!("Only the owner may {}", action))
            }
            BookServiceError::AudioUnavailable => {
                AppError::NotFound("Audio not yet available".to_string())
            }
            BookServiceError::Storage(e) => AppError::Storage(e),
            BookServiceError::Narration(e) => e.into(),
            BookServiceError::Dependency(msg) => AppError::Internal(msg),
            BookServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
