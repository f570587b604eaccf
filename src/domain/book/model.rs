use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub source_content_type: String,
    pub has_cover: bool,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a book about to be inserted
#[derive(Debug, Clone)]
pub struct NewBook {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub source_content_type: String,
    pub has_cover: bool,
}
