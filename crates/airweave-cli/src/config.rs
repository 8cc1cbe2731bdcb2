//! Configuration loaded from environment variables, following
//! `rootsignal-common::config::Config::from_env`: required secrets panic
//! with a clear message at startup, everything else falls back to a
//! sensible default.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub storage_root: String,

    /// Supplemented feature (spec `core/rate_limiter_service.py`): both
    /// rate limiters no-op entirely when this is false.
    pub rate_limit_enabled: bool,

    pub worker_count: Option<usize>,
    pub per_pod_limit: usize,
    pub per_pod_window_secs: u64,
    pub per_pod_timeout_secs: u64,

    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub embedding_vector_size: usize,

    pub chat_endpoint: String,
    pub chat_api_key: String,
    pub chat_model: String,

    pub search_defaults_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            redis_url: required_env("REDIS_URL"),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".into()),

            rate_limit_enabled: env::var("RATE_LIMIT_ENABLED")
                .ok()
                .map(|v| v != "false")
                .unwrap_or(true),

            worker_count: env::var("AIRWEAVE_SYNC_WORKERS").ok().and_then(|v| v.parse().ok()),
            per_pod_limit: env_or("PER_POD_LIMIT", 10),
            per_pod_window_secs: env_or("PER_POD_WINDOW_SECS", 1),
            per_pod_timeout_secs: env_or("PER_POD_TIMEOUT_SECS", 30),

            embedding_endpoint: env::var("EMBEDDING_ENDPOINT").ok(),
            embedding_api_key: env::var("EMBEDDING_API_KEY").unwrap_or_default(),
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into()),
            embedding_vector_size: env_or("EMBEDDING_VECTOR_SIZE", 1536),

            chat_endpoint: env::var("CHAT_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            chat_api_key: env::var("CHAT_API_KEY").unwrap_or_default(),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),

            search_defaults_path: env::var("SEARCH_DEFAULTS_PATH").unwrap_or_else(|_| "./search_defaults.yml".into()),
        }
    }

    /// Logs lengths, never values, of secret-bearing fields.
    pub fn log_redacted(&self) {
        let secrets = [
            ("DATABASE_URL", &self.database_url),
            ("REDIS_URL", &self.redis_url),
            ("EMBEDDING_API_KEY", &self.embedding_api_key),
            ("CHAT_API_KEY", &self.chat_api_key),
        ];
        for (name, value) in secrets {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
