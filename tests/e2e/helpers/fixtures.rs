use async_trait::async_trait;
use audiobook_backend::domain::book::{Book, NewBook};
use audiobook_backend::error::{AppError, AppResult};
use audiobook_backend::infrastructure::repositories::{BookRepository, TtsRepository, VoiceProfile};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Book repository kept in process memory
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: Mutex<BTreeMap<Uuid, Book>>,
    likes: Mutex<BTreeSet<(Uuid, String)>>,
    like_order: AtomicU64,
    liked_at: Mutex<BTreeMap<(Uuid, String), u64>>,
    pub unavailable: AtomicBool,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        let mut books = self.books.lock();
        if books.contains_key(&book.id) {
            return Err(AppError::Conflict("Book already exists".to_string()));
        }
        let stored = Book {
            id: book.id,
            owner: book.owner.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            source_content_type: book.source_content_type.clone(),
            has_cover: book.has_cover,
            likes: 0,
            created_at: Utc::now(),
        };
        books.insert(book.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.books.lock().get(&id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.lock().values().cloned().collect())
    }

    async fn list_by_owner(&self, owner: &str) -> AppResult<Vec<Book>> {
        Ok(self
            .books
            .lock()
            .values()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect())
    }

    async fn list_liked_by(&self, user_email: &str) -> AppResult<Vec<Book>> {
        let books = self.books.lock();
        let likes = self.likes.lock();
        Ok(books
            .values()
            .filter(|b| likes.contains(&(b.id, user_email.to_string())))
            .cloned()
            .collect())
    }

    async fn toggle_like(&self, id: Uuid, user_email: &str) -> AppResult<Option<i32>> {
        let mut books = self.books.lock();
        let Some(book) = books.get_mut(&id) else {
            return Ok(None);
        };
        let mut likes = self.likes.lock();
        let entry = (id, user_email.to_string());
        if likes.remove(&entry) {
            self.liked_at.lock().remove(&entry);
            book.likes = (book.likes - 1).max(0);
        } else {
            let order = self.like_order.fetch_add(1, Ordering::SeqCst);
            self.liked_at.lock().insert(entry.clone(), order);
            likes.insert(entry);
            book.likes += 1;
        }
        Ok(Some(book.likes))
    }

    async fn list_likers(&self, id: Uuid) -> AppResult<Vec<String>> {
        let mut likers: Vec<(u64, String)> = self
            .liked_at
            .lock()
            .iter()
            .filter(|((book_id, _), _)| *book_id == id)
            .map(|((_, email), order)| (*order, email.clone()))
            .collect();
        likers.sort();
        Ok(likers.into_iter().map(|(_, email)| email).collect())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let removed = self.books.lock().remove(&id).is_some();
        self.likes.lock().retain(|(book_id, _)| *book_id != id);
        self.liked_at.lock().retain(|(book_id, _), _| *book_id != id);
        Ok(removed)
    }

    async fn ping(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("database unreachable".to_string()));
        }
        Ok(())
    }
}

/// TTS provider answering with recognizable bytes after `latency_ms`
#[derive(Default)]
pub struct FakeTts {
    pub calls: AtomicUsize,
    pub fail_all: AtomicBool,
    pub latency_ms: AtomicU64,
}

impl FakeTts {
    pub fn audio_for(text: &str) -> Vec<u8> {
        format!("[{}]", text).into_bytes()
    }
}

#[async_trait]
impl TtsRepository for FakeTts {
    async fn synthesize(&self, text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>, String> {
        let latency_ms = self.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err("ServiceFailureException".to_string());
        }
        Ok(Self::audio_for(text))
    }
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn sample_book_text() -> String {
    "The quick brown fox jumps over the lazy dog while the narrator keeps reading. ".repeat(8)
}

pub fn create_book_body(title: &str, source: &[u8], cover: Option<&[u8]>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "title": title,
        "author": "Test Author",
        "genre": "Fiction",
        "source": encode(source),
        "source_content_type": "text/plain",
    });
    if let Some(cover) = cover {
        body["cover"] = serde_json::Value::String(encode(cover));
    }
    body
}
