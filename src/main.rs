use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audiobook_backend::controllers::{book::BookController, narration::NarrationController};
use audiobook_backend::domain::auth::JwtManager;
use audiobook_backend::domain::book::BookService;
use audiobook_backend::domain::narration::{NarrationWorkflow, WallClockBudgets};
use audiobook_backend::infrastructure::config::{Config, LogFormat, StorageBackend};
use audiobook_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use audiobook_backend::infrastructure::http::{build_router, start_http_server};
use audiobook_backend::infrastructure::repositories::{
    BookRepository, PollyTtsRepository, PostgresBookRepository, TtsRepository,
};
use audiobook_backend::infrastructure::storage::{BlobStore, InMemoryBlobStore, S3BlobStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_logging(&config);

    tracing::info!(
        "Starting Audiobook Backend on {}:{}",
        config.host,
        config.port
    );

    let pool = create_pool(&config.database_url).await?;
    check_connection(&pool).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database connection verified and migrations applied");

    let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
    let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
    tracing::info!(
        has_access_key_id = has_access_key,
        has_secret_access_key = has_secret_key,
        "AWS credentials environment check"
    );
    if !has_access_key || !has_secret_key {
        tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
    }

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    tracing::info!(region = ?aws_config.region(), "AWS configuration loaded");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Storage and repositories
    let blob_store: Arc<dyn BlobStore> = match config.storage_backend {
        StorageBackend::S3 => {
            tracing::info!(bucket = %config.bucket_name, "Using S3 blob storage");
            Arc::new(S3BlobStore::new(
                Arc::new(aws_sdk_s3::Client::new(&aws_config)),
                config.bucket_name.clone(),
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob storage, artifacts are lost on restart");
            Arc::new(InMemoryBlobStore::new())
        }
    };
    let book_repo: Arc<dyn BookRepository> = Arc::new(PostgresBookRepository::new(pool.clone()));
    let tts_repo: Arc<dyn TtsRepository> = Arc::new(PollyTtsRepository::new(Arc::new(
        aws_sdk_polly::Client::new(&aws_config),
    )));

    // 2. Narration pipeline
    let narration = &config.narration;
    tracing::info!(
        audio_chunk_size = narration.audio_chunk_size,
        checkpoint_interval = narration.checkpoint_interval,
        invocation_window_secs = narration.invocation_window_secs,
        voice = %narration.polly_voice_id,
        "Narration pipeline configured"
    );
    let workflow = Arc::new(NarrationWorkflow::from_settings(
        blob_store.clone(),
        tts_repo,
        Arc::new(WallClockBudgets::new(narration.invocation_window())),
        narration,
    ));

    // 3. Services and controllers
    let book_service = Arc::new(BookService::new(
        book_repo.clone(),
        blob_store,
        workflow,
        config.presigned_url_ttl(),
    ));
    let book_controller = Arc::new(BookController::new(book_service.clone()));
    let narration_controller = Arc::new(NarrationController::new(book_service));
    let jwt_manager = Arc::new(JwtManager::new(config.jwt_secret.clone()));

    let app = build_router(book_repo, jwt_manager, book_controller, narration_controller);
    start_http_server(config, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_log_filter().into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
