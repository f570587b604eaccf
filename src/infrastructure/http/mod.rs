use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::auth::JwtManager;
use crate::infrastructure::config::Config;
use crate::infrastructure::repositories::BookRepository;
use crate::{
    controllers::{book::BookController, health, narration::NarrationController},
    infrastructure::auth::{auth_middleware, request_id_middleware},
};

/// Assemble every route with its middleware
pub fn build_router(
    book_repo: Arc<dyn BookRepository>,
    jwt_manager: Arc<JwtManager>,
    book_controller: Arc<BookController>,
    narration_controller: Arc<NarrationController>,
) -> Router {
    // Book routes (require authentication)
    let book_routes = Router::new()
        .route(
            "/api/books",
            get(BookController::list_books).post(BookController::create_book),
        )
        .route("/api/books/mine", get(BookController::list_my_books))
        .route("/api/books/liked", get(BookController::list_liked_books))
        .route("/api/books/:bookId", delete(BookController::delete_book))
        .route("/api/books/:bookId/like", post(BookController::toggle_like))
        .route("/api/books/:bookId/likes", get(BookController::list_likes))
        .with_state(book_controller)
        .layer(middleware::from_fn_with_state(
            jwt_manager.clone(),
            auth_middleware,
        ));

    // Narration routes (require authentication)
    let narration_routes = Router::new()
        .route(
            "/api/books/:bookId/narration",
            get(NarrationController::narration_status).post(NarrationController::request_narration),
        )
        .route("/api/books/:bookId/audio", get(NarrationController::audio_url))
        .with_state(narration_controller)
        .layer(middleware::from_fn_with_state(jwt_manager, auth_middleware));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(book_repo)
        .merge(book_routes)
        .merge(narration_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
