use anyhow::Result;
use audiobook_backend::infrastructure::config::{
    Config, Environment, LogFormat, NarrationSettings, StorageBackend,
};
use axum::Router;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use test_context::AsyncTestContext;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio::net::TcpListener;

pub mod api_client;
pub mod fixtures;

use api_client::TestClient;
use db_pool::{DatabasePool, PooledDatabase};
use fixtures::{FakeTts, InMemoryBookRepository};

use audiobook_backend::infrastructure::repositories::PostgresBookRepository;
use audiobook_backend::infrastructure::storage::InMemoryBlobStore;

pub const JWT_SECRET: &str = "test-jwt-secret-key-for-testing-only";

static DOCKER: Lazy<Cli> = Lazy::new(Cli::default);

// One PostgreSQL container shared by every repository test
static SHARED_CONTAINER: Lazy<SharedContainer> = Lazy::new(SharedContainer::new);

static DB_POOL: Lazy<DatabasePool> = Lazy::new(|| DatabasePool::new(SHARED_CONTAINER.port));

struct SharedContainer {
    _container: Container<'static, Postgres>,
    port: u16,
}

impl SharedContainer {
    fn new() -> Self {
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);
        println!("Started shared PostgreSQL container on port {}", port);

        Self {
            _container: container,
            port,
        }
    }
}

/// HTTP server over in-memory storage and a fake TTS provider
pub struct TestContext {
    pub client: TestClient,
    pub books: Arc<InMemoryBookRepository>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub tts: Arc<FakeTts>,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let config = Config {
                database_url: "postgres://unused".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
                jwt_secret: JWT_SECRET.to_string(),
                aws_region: "us-east-1".to_string(),
                environment: Environment::Development,
                log_format: LogFormat::Pretty,
                storage_backend: StorageBackend::Memory,
                bucket_name: "test-bucket".to_string(),
                presigned_url_ttl_secs: 3600,
                narration: NarrationSettings {
                    audio_chunk_size: 120,
                    text_chunk_size: 200,
                    checkpoint_interval: 2,
                    synthesis_retry_delay_ms: 0,
                    ..NarrationSettings::default()
                },
            };

            let books = Arc::new(InMemoryBookRepository::new());
            let blobs = Arc::new(InMemoryBlobStore::new());
            let tts = Arc::new(FakeTts::default());

            let app = create_app(&config, books.clone(), blobs.clone(), tts.clone())
                .expect("Failed to create app");

            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            tokio::time::sleep(Duration::from_millis(50)).await;

            Self {
                client: TestClient::new(&base_url),
                books,
                blobs,
                tts,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }
}

fn create_app(
    config: &Config,
    books: Arc<InMemoryBookRepository>,
    blobs: Arc<InMemoryBlobStore>,
    tts: Arc<FakeTts>,
) -> Result<Router> {
    use audiobook_backend::{
        controllers::{book::BookController, narration::NarrationController},
        domain::{
            auth::JwtManager,
            book::BookService,
            narration::{NarrationWorkflow, WallClockBudgets},
        },
        infrastructure::http::build_router,
    };

    let workflow = Arc::new(NarrationWorkflow::from_settings(
        blobs.clone(),
        tts,
        Arc::new(WallClockBudgets::new(config.narration.invocation_window())),
        &config.narration,
    ));
    let book_service = Arc::new(BookService::new(
        books.clone(),
        blobs,
        workflow,
        config.presigned_url_ttl(),
    ));

    Ok(build_router(
        books,
        Arc::new(JwtManager::new(config.jwt_secret.clone())),
        Arc::new(BookController::new(book_service.clone())),
        Arc::new(NarrationController::new(book_service)),
    ))
}

/// [`PostgresBookRepository`] over a freshly migrated database
pub struct RepositoryContext {
    pub repo: PostgresBookRepository,
    pub pool: PgPool,
    _db: PooledDatabase,
}

impl AsyncTestContext for RepositoryContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let pooled_db = DB_POOL
                .get_database()
                .await
                .expect("Failed to get database from pool");

            Self {
                repo: PostgresBookRepository::new(Arc::new(pooled_db.pool.clone())),
                pool: pooled_db.pool.clone(),
                _db: pooled_db,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // the database returns to the pool when `_db` drops
        }
    }
}

/// Valid HS256 token carrying `email` as the owner identity
pub fn token_for(email: &str) -> String {
    use audiobook_backend::domain::auth::JwtManager;

    JwtManager::new(JWT_SECRET)
        .generate_token(email, email, 1)
        .unwrap()
}
