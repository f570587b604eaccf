use crate::domain::book::{Book, NewBook};
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::{check_connection, DbPool};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Book metadata and the per-user like set
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: &NewBook) -> AppResult<Book>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn list_all(&self) -> AppResult<Vec<Book>>;

    async fn list_by_owner(&self, owner: &str) -> AppResult<Vec<Book>>;

    async fn list_liked_by(&self, user_email: &str) -> AppResult<Vec<Book>>;

    /// Like if not yet liked by `user_email`, unlike otherwise.
    /// Returns the new like count, or `None` for an unknown book.
    async fn toggle_like(&self, id: Uuid, user_email: &str) -> AppResult<Option<i32>>;

    /// Emails of the users who liked the book, earliest like first
    async fn list_likers(&self, id: Uuid) -> AppResult<Vec<String>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;
}

const BOOK_COLUMNS: &str =
    "id, owner, title, author, genre, source_content_type, has_cover, likes, created_at";

pub struct PostgresBookRepository {
    pool: Arc<DbPool>,
}

impl PostgresBookRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        let pool = self.pool.as_ref();
        let inserted = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (id, owner, title, author, genre, source_content_type, has_cover, likes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.id)
        .bind(&book.owner)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.source_content_type)
        .bind(book.has_cover)
        .bind(chrono::Utc::now())
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("Book already exists".to_string());
                }
            }
            AppError::Database(e)
        })?;

        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let pool = self.pool.as_ref();
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(book)
    }

    async fn list_all(&self) -> AppResult<Vec<Book>> {
        let pool = self.pool.as_ref();
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY created_at DESC",
            BOOK_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(books)
    }

    async fn list_by_owner(&self, owner: &str) -> AppResult<Vec<Book>> {
        let pool = self.pool.as_ref();
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE owner = $1 ORDER BY created_at DESC",
            BOOK_COLUMNS
        ))
        .bind(owner)
        .fetch_all(pool)
        .await?;

        Ok(books)
    }

    async fn list_liked_by(&self, user_email: &str) -> AppResult<Vec<Book>> {
        let pool = self.pool.as_ref();
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.id, b.owner, b.title, b.author, b.genre, b.source_content_type,
                   b.has_cover, b.likes, b.created_at
            FROM books b
            JOIN book_likes l ON l.book_id = b.id
            WHERE l.user_email = $1
            ORDER BY l.liked_at DESC
            "#,
        )
        .bind(user_email)
        .fetch_all(pool)
        .await?;

        Ok(books)
    }

    async fn toggle_like(&self, id: Uuid, user_email: &str) -> AppResult<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let removed = sqlx::query("DELETE FROM book_likes WHERE book_id = $1 AND user_email = $2")
            .bind(id)
            .bind(user_email)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let likes = if removed {
            sqlx::query_scalar::<_, i32>(
                "UPDATE books SET likes = GREATEST(likes - 1, 0) WHERE id = $1 RETURNING likes",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query("INSERT INTO book_likes (book_id, user_email, liked_at) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(user_email)
                .bind(chrono::Utc::now())
                .execute(&mut *tx)
                .await?;
            sqlx::query_scalar::<_, i32>(
                "UPDATE books SET likes = likes + 1 WHERE id = $1 RETURNING likes",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;
        Ok(Some(likes))
    }

    async fn list_likers(&self, id: Uuid) -> AppResult<Vec<String>> {
        let pool = self.pool.as_ref();
        let likers = sqlx::query_scalar::<_, String>(
            "SELECT user_email FROM book_likes WHERE book_id = $1 ORDER BY liked_at, user_email",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(likers)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let pool = self.pool.as_ref();
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        check_connection(&self.pool).await?;
        Ok(())
    }
}
