use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub aws_region: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Blob storage
    pub storage_backend: StorageBackend,
    pub bucket_name: String,
    pub presigned_url_ttl_secs: u64,
    pub narration: NarrationSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

/// Tuning knobs for the narration pipeline
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NarrationSettings {
    pub audio_chunk_size: usize,
    pub text_chunk_size: usize,
    pub checkpoint_interval: usize,
    pub synthesis_max_attempts: u32,
    pub synthesis_retry_delay_ms: u64,
    pub budget_safety_threshold_secs: u64,
    pub invocation_window_secs: u64,
    pub max_invocations: usize,
    pub polly_voice_id: String,
    pub polly_engine: String,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            audio_chunk_size: 1500,
            text_chunk_size: 3000,
            checkpoint_interval: 10,
            synthesis_max_attempts: 3,
            synthesis_retry_delay_ms: 1000,
            budget_safety_threshold_secs: 60,
            invocation_window_secs: 900,
            max_invocations: 50,
            polly_voice_id: "Joanna".to_string(),
            polly_engine: "standard".to_string(),
        }
    }
}

impl NarrationSettings {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();
        Ok(Self {
            audio_chunk_size: parse_or("AUDIO_CHUNK_SIZE", defaults.audio_chunk_size)?,
            text_chunk_size: parse_or("TEXT_CHUNK_SIZE", defaults.text_chunk_size)?,
            checkpoint_interval: parse_or("CHECKPOINT_INTERVAL", defaults.checkpoint_interval)?,
            synthesis_max_attempts: parse_or("SYNTHESIS_MAX_ATTEMPTS", defaults.synthesis_max_attempts)?,
            synthesis_retry_delay_ms: parse_or("SYNTHESIS_RETRY_DELAY_MS", defaults.synthesis_retry_delay_ms)?,
            budget_safety_threshold_secs: parse_or(
                "BUDGET_SAFETY_THRESHOLD_SECS",
                defaults.budget_safety_threshold_secs,
            )?,
            invocation_window_secs: parse_or("INVOCATION_WINDOW_SECS", defaults.invocation_window_secs)?,
            max_invocations: parse_or("MAX_INVOCATIONS", defaults.max_invocations)?,
            polly_voice_id: env::var("POLLY_VOICE_ID").unwrap_or(defaults.polly_voice_id),
            polly_engine: env::var("POLLY_ENGINE").unwrap_or(defaults.polly_engine),
        })
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.synthesis_retry_delay_ms)
    }

    pub fn safety_threshold(&self) -> Duration {
        Duration::from_secs(self.budget_safety_threshold_secs)
    }

    pub fn invocation_window(&self) -> Duration {
        Duration::from_secs(self.invocation_window_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            environment: match env::var("ENVIRONMENT").as_deref() {
                Ok("production") => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            storage_backend: match env::var("STORAGE_BACKEND").map(|s| s.to_lowercase()).as_deref() {
                Ok("memory") => StorageBackend::Memory,
                _ => StorageBackend::S3,
            },
            bucket_name: env::var("BUCKET_NAME").unwrap_or_else(|_| "my-books-bucket".to_string()),
            presigned_url_ttl_secs: parse_or("PRESIGNED_URL_TTL_SECS", 3600)?,
            narration: NarrationSettings::from_env()?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Log filter used when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_development() {
            "audiobook_backend=debug,tower_http=debug"
        } else {
            "audiobook_backend=info,tower_http=info"
        }
    }

    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.presigned_url_ttl_secs)
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid value for {}: {}", name, e).into()),
        Err(_) => Ok(default),
    }
}
