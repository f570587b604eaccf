use super::error::BookServiceError;
use crate::domain::book::{
    AudioUrlResponse, Book, BookResponse, CreateBookRequest, CreateBookResponse, LikerResponse,
    NewBook, DEFAULT_SOURCE_CONTENT_TYPE,
};
use crate::domain::narration::{NarrationProgress, NarrationWorkflow, StartOutcome};
use crate::infrastructure::repositories::BookRepository;
use crate::infrastructure::storage::{Artifact, BlobStore, DocumentKey};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_TITLE_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationRequestOutcome {
    AudioExists,
    Started,
    InProgress,
}

impl NarrationRequestOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AudioExists => "Audio already exists",
            Self::Started => "Process started",
            Self::InProgress => "Process already in progress",
        }
    }
}

pub struct BookService {
    book_repo: Arc<dyn BookRepository>,
    blob_store: Arc<dyn BlobStore>,
    workflow: Arc<NarrationWorkflow>,
    presigned_url_ttl: Duration,
}

impl BookService {
    pub fn new(
        book_repo: Arc<dyn BookRepository>,
        blob_store: Arc<dyn BlobStore>,
        workflow: Arc<NarrationWorkflow>,
        presigned_url_ttl: Duration,
    ) -> Self {
        Self {
            book_repo,
            blob_store,
            workflow,
            presigned_url_ttl,
        }
    }
}

#[async_trait]
pub trait BookServiceApi: Send + Sync {
    async fn create_book(
        &self,
        owner: &str,
        request: CreateBookRequest,
    ) -> Result<CreateBookResponse, BookServiceError>;

    async fn list_all(&self) -> Result<Vec<BookResponse>, BookServiceError>;

    async fn list_owned(&self, owner: &str) -> Result<Vec<BookResponse>, BookServiceError>;

    async fn list_liked(&self, user_email: &str) -> Result<Vec<BookResponse>, BookServiceError>;

    async fn toggle_like(&self, user_email: &str, book_id: Uuid) -> Result<i32, BookServiceError>;

    async fn list_likes(&self, book_id: Uuid) -> Result<Vec<LikerResponse>, BookServiceError>;

    async fn delete_book(&self, user_email: &str, book_id: Uuid) -> Result<(), BookServiceError>;

    async fn request_narration(
        &self,
        user_email: &str,
        book_id: Uuid,
    ) -> Result<NarrationRequestOutcome, BookServiceError>;

    async fn narration_status(&self, book_id: Uuid) -> Result<NarrationProgress, BookServiceError>;

    async fn audio_url(&self, book_id: Uuid) -> Result<AudioUrlResponse, BookServiceError>;
}

#[async_trait]
impl BookServiceApi for BookService {
    async fn create_book(
        &self,
        owner: &str,
        request: CreateBookRequest,
    ) -> Result<CreateBookResponse, BookServiceError> {
        let title = request.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(BookServiceError::Invalid(format!(
                "title must be between 1 and {} characters",
                MAX_TITLE_CHARS
            )));
        }
        if request.author.trim().is_empty() {
            return Err(BookServiceError::Invalid("author is required".to_string()));
        }

        let source = decode_base64("source", &request.source)?;
        if source.is_empty() {
            return Err(BookServiceError::Invalid("source document is empty".to_string()));
        }
        let cover = request
            .cover
            .as_deref()
            .map(|c| decode_base64("cover", c))
            .transpose()?;

        let key = DocumentKey::new(owner, Uuid::new_v4());
        let source_content_type = request
            .source_content_type
            .unwrap_or_else(|| DEFAULT_SOURCE_CONTENT_TYPE.to_string());

        self.blob_store
            .put(&key.artifact(Artifact::Source), source, &source_content_type)
            .await?;
        if let Some(cover) = &cover {
            self.blob_store
                .put(&key.artifact(Artifact::Cover), cover.clone(), Artifact::Cover.content_type())
                .await?;
        }

        let new_book = NewBook {
            id: key.document_id,
            owner: owner.to_string(),
            title: title.to_string(),
            author: request.author.trim().to_string(),
            genre: request.genre.trim().to_string(),
            source_content_type,
            has_cover: cover.is_some(),
        };
        if let Err(e) = self.book_repo.insert(&new_book).await {
            tracing::warn!(document = %key, error = %e, "Metadata insert failed, removing uploaded blobs");
            self.delete_blobs(&key).await?;
            return Err(e.into());
        }

        tracing::info!(document = %key, title = %new_book.title, "Book created");
        Ok(CreateBookResponse { id: key.document_id })
    }

    async fn list_all(&self) -> Result<Vec<BookResponse>, BookServiceError> {
        let books = self.book_repo.list_all().await?;
        self.to_responses(books).await
    }

    async fn list_owned(&self, owner: &str) -> Result<Vec<BookResponse>, BookServiceError> {
        let books = self.book_repo.list_by_owner(owner).await?;
        self.to_responses(books).await
    }

    async fn list_liked(&self, user_email: &str) -> Result<Vec<BookResponse>, BookServiceError> {
        let books = self.book_repo.list_liked_by(user_email).await?;
        self.to_responses(books).await
    }

    async fn toggle_like(&self, user_email: &str, book_id: Uuid) -> Result<i32, BookServiceError> {
        let likes = self
            .book_repo
            .toggle_like(book_id, user_email)
            .await?
            .ok_or(BookServiceError::NotFound)?;
        tracing::debug!(book_id = %book_id, likes = likes, "Like toggled");
        Ok(likes)
    }

    async fn list_likes(&self, book_id: Uuid) -> Result<Vec<LikerResponse>, BookServiceError> {
        let book = self.find_book(book_id).await?;
        let likers = self.book_repo.list_likers(book.id).await?;
        Ok(likers
            .into_iter()
            .map(|email| LikerResponse { email })
            .collect())
    }

    async fn delete_book(&self, user_email: &str, book_id: Uuid) -> Result<(), BookServiceError> {
        let book = self.find_book(book_id).await?;
        if book.owner != user_email {
            return Err(BookServiceError::Forbidden("delete this book"));
        }

        let key = DocumentKey::new(book.owner, book.id);
        self.workflow.retire(&key).await;
        let removed = self.remove_document(&key).await;
        self.workflow.forget(&key);
        let removed = removed?;

        tracing::info!(document = %key, blobs_removed = removed, "Book deleted");
        Ok(())
    }

    async fn request_narration(
        &self,
        user_email: &str,
        book_id: Uuid,
    ) -> Result<NarrationRequestOutcome, BookServiceError> {
        let book = self.find_book(book_id).await?;
        if book.owner != user_email {
            return Err(BookServiceError::Forbidden("request narration"));
        }

        let outcome = match self.workflow.start(DocumentKey::new(book.owner, book.id)).await? {
            StartOutcome::AlreadyComplete => NarrationRequestOutcome::AudioExists,
            StartOutcome::AlreadyRunning => NarrationRequestOutcome::InProgress,
            StartOutcome::Started => NarrationRequestOutcome::Started,
        };
        Ok(outcome)
    }

    async fn narration_status(&self, book_id: Uuid) -> Result<NarrationProgress, BookServiceError> {
        let book = self.find_book(book_id).await?;
        Ok(self.workflow.status(&DocumentKey::new(book.owner, book.id)).await?)
    }

    async fn audio_url(&self, book_id: Uuid) -> Result<AudioUrlResponse, BookServiceError> {
        let book = self.find_book(book_id).await?;
        let audio_key = DocumentKey::new(book.owner, book.id).artifact(Artifact::Audio);
        if !self.blob_store.exists(&audio_key).await? {
            return Err(BookServiceError::AudioUnavailable);
        }

        let audio_url = self
            .blob_store
            .presign_get(&audio_key, self.presigned_url_ttl)
            .await?;
        Ok(AudioUrlResponse { audio_url })
    }
}

impl BookService {
    async fn find_book(&self, book_id: Uuid) -> Result<Book, BookServiceError> {
        self.book_repo
            .find_by_id(book_id)
            .await?
            .ok_or(BookServiceError::NotFound)
    }

    async fn remove_document(&self, key: &DocumentKey) -> Result<usize, BookServiceError> {
        let removed = self.delete_blobs(key).await?;
        self.book_repo.delete(key.document_id).await?;
        Ok(removed)
    }

    async fn delete_blobs(&self, key: &DocumentKey) -> Result<usize, BookServiceError> {
        let keys = self.blob_store.list(&key.prefix()).await?;
        for blob_key in &keys {
            self.blob_store.delete(blob_key).await?;
        }
        Ok(keys.len())
    }

    async fn to_responses(&self, books: Vec<Book>) -> Result<Vec<BookResponse>, BookServiceError> {
        let mut responses = Vec::with_capacity(books.len());
        for book in books {
            let key = DocumentKey::new(book.owner.clone(), book.id);
            let source_url = self
                .blob_store
                .presign_get(&key.artifact(Artifact::Source), self.presigned_url_ttl)
                .await?;
            let cover_url = if book.has_cover {
                Some(
                    self.blob_store
                        .presign_get(&key.artifact(Artifact::Cover), self.presigned_url_ttl)
                        .await?,
                )
            } else {
                None
            };

            responses.push(BookResponse {
                id: book.id,
                owner: book.owner,
                title: book.title,
                author: book.author,
                genre: book.genre,
                likes: book.likes,
                source_url,
                cover_url,
                created_at: book.created_at,
            });
        }
        Ok(responses)
    }
}

fn decode_base64(field: &str, encoded: &str) -> Result<Vec<u8>, BookServiceError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| BookServiceError::Invalid(format!("{} is not valid base64: {}", field, e)))
}
