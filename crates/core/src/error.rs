//! Typed error hierarchy shared by every crate in the workspace, covering
//! the graph/retrieval/ingestion error variants each layer raises.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("vector store error ({backend}): {message}")]
    VectorStore { backend: String, message: String },

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("ingestion error: {0}")]
    Ingest(String),

    #[error("repo graph builder error: {0}")]
    Graph(String),

    #[error("canonical identity error: {0}")]
    Identity(String),

    #[error("retrieval plan error: {0}")]
    Plan(String),

    #[error("llm error ({provider}): {message}")]
    Llm { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// The three stable error-code buckets, independent of the richer internal
/// `RagError` variant — used by the HTTP layer to map errors onto the
/// `{error_code, message, details?}` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Internal,
}

impl RagError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RagError::Validation(_) => ErrorCategory::InvalidRequest,
            _ => ErrorCategory::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.category() {
            ErrorCategory::InvalidRequest => "INVALID_REQUEST",
            ErrorCategory::Internal => "INTERNAL_ERROR",
        }
    }
}
