use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::book::{AudioUrlResponse, MessageResponse, NarrationRequestOutcome};
use crate::domain::narration::NarrationProgress;
use crate::{
    domain::book::{BookService, BookServiceApi},
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct NarrationController {
    book_service: Arc<BookService>,
}

impl NarrationController {
    pub fn new(book_service: Arc<BookService>) -> Self {
        Self { book_service }
    }

    /// POST /api/books/{bookId}/narration - Start audio generation
    pub async fn request_narration(
        State(controller): State<Arc<NarrationController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, Json<MessageResponse>)> {
        let outcome = controller
            .book_service
            .request_narration(&auth_user.email, book_id)
            .await?;

        let status = match outcome {
            NarrationRequestOutcome::AudioExists => StatusCode::OK,
            NarrationRequestOutcome::Started | NarrationRequestOutcome::InProgress => {
                StatusCode::ACCEPTED
            }
        };
        Ok((
            status,
            Json(MessageResponse {
                message: outcome.message().to_string(),
            }),
        ))
    }

    /// GET /api/books/{bookId}/narration - Progress of audio generation
    pub async fn narration_status(
        State(controller): State<Arc<NarrationController>>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<Json<NarrationProgress>> {
        let progress = controller.book_service.narration_status(book_id).await?;
        Ok(Json(progress))
    }

    /// GET /api/books/{bookId}/audio - Presigned URL of the finished audio
    pub async fn audio_url(
        State(controller): State<Arc<NarrationController>>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<Json<AudioUrlResponse>> {
        let response = controller.book_service.audio_url(book_id).await?;
        Ok(Json(response))
    }
}
