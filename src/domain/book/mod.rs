pub mod error;
pub mod model;
pub mod service;

pub use error::BookServiceError;
pub use model::{Book, NewBook};
pub use service::{BookService, BookServiceApi, NarrationRequestOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SOURCE_CONTENT_TYPE: &str = "application/pdf";

/// Request to upload a new book
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    /// Base64 encoded source document
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_content_type: Option<String>,
    /// Base64 encoded cover image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBookResponse {
    pub id: Uuid,
}

/// Response for catalogue endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub likes: i32,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: i32,
}

/// One user who liked a book
#[derive(Debug, Serialize, Deserialize)]
pub struct LikerResponse {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioUrlResponse {
    pub audio_url: String,
}
