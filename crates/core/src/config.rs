//! Process-wide settings, populated once from the environment and cached
//! in a `OnceLock` — realizes the Design Note "process-wide caches → typed
//! singletons with explicit lifetime" (the settings object half of it; the
//! `repo_id -> CodebaseGraph` cache lives in `hybridrag-graph`).

use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub llm_service_url: Option<String>,
    pub default_top_k: usize,
    pub max_chunks_per_document: usize,
    pub max_total_tokens: usize,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/hybridrag".to_string(),
            embedding_model: "BAAI/bge-small-en-v1.5".to_string(),
            embedding_dim: 384,
            llm_service_url: None,
            default_top_k: 20,
            max_chunks_per_document: 5,
            max_total_tokens: 4096,
            request_timeout_secs: 120,
        }
    }
}

impl Settings {
    /// Load from environment, falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            embedding_model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dim: std::env::var("EMBEDDING_DIM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.embedding_dim),
            llm_service_url: std::env::var("LLM_SERVICE_URL").ok(),
            default_top_k: std::env::var("DEFAULT_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_top_k),
            max_chunks_per_document: std::env::var("MAX_CHUNKS_PER_DOCUMENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chunks_per_document),
            max_total_tokens: std::env::var("MAX_TOTAL_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_total_tokens),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Returns the process-wide settings, loading from environment on first
/// call. Subsequent calls return the same instance.
pub fn get_settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::from_env)
}
