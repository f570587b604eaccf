use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::book::{
    BookResponse, CreateBookRequest, CreateBookResponse, LikeResponse, LikerResponse,
};
use crate::{
    domain::book::{BookService, BookServiceApi},
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct BookController {
    book_service: Arc<BookService>,
}

impl BookController {
    pub fn new(book_service: Arc<BookService>) -> Self {
        Self { book_service }
    }

    /// GET /api/books - List every book
    pub async fn list_books(
        State(controller): State<Arc<BookController>>,
    ) -> AppResult<Json<Vec<BookResponse>>> {
        let books = controller.book_service.list_all().await?;
        Ok(Json(books))
    }

    /// GET /api/books/mine - List the caller's uploads
    pub async fn list_my_books(
        State(controller): State<Arc<BookController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<Vec<BookResponse>>> {
        let books = controller.book_service.list_owned(&auth_user.email).await?;
        Ok(Json(books))
    }

    /// GET /api/books/liked - List books the caller liked
    pub async fn list_liked_books(
        State(controller): State<Arc<BookController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<Vec<BookResponse>>> {
        let books = controller.book_service.list_liked(&auth_user.email).await?;
        Ok(Json(books))
    }

    /// POST /api/books - Upload a new book
    pub async fn create_book(
        State(controller): State<Arc<BookController>>,
        Extension(auth_user): Extension<AuthUser>,
        Json(request): Json<CreateBookRequest>,
    ) -> AppResult<(StatusCode, Json<CreateBookResponse>)> {
        let created = controller
            .book_service
            .create_book(&auth_user.email, request)
            .await?;
        Ok((StatusCode::CREATED, Json(created)))
    }

    /// POST /api/books/{bookId}/like - Toggle the caller's like
    pub async fn toggle_like(
        State(controller): State<Arc<BookController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<Json<LikeResponse>> {
        let likes = controller
            .book_service
            .toggle_like(&auth_user.email, book_id)
            .await?;
        Ok(Json(LikeResponse { likes }))
    }

    /// GET /api/books/{bookId}/likes - List the users who liked a book
    pub async fn list_likes(
        State(controller): State<Arc<BookController>>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<Json<Vec<LikerResponse>>> {
        let likers = controller.book_service.list_likes(book_id).await?;
        Ok(Json(likers))
    }

    /// DELETE /api/books/{bookId} - Delete a book and all its artifacts
    pub async fn delete_book(
        State(controller): State<Arc<BookController>>,
        Extension(auth_user): Extension<AuthUser>,
        Path(book_id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller
            .book_service
            .delete_book(&auth_user.email, book_id)
            .await?;
        Ok(StatusCode::NO_CONTENT)
    }
}
