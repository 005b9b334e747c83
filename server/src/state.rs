//! Shared application state handed to every axum route via
//! `State<AppState>`: one `Clone`-able struct bundling every collaborator
//! (stores, embedder, LLM client, caches) behind `Arc`.

use dashmap::DashMap;
use hybridrag_core::error::Result;
use hybridrag_core::tokenizer::{create_tokenizer, Tokenizer};
use hybridrag_graph::RepoGraphCache;
use hybridrag_ingest::{EmbeddingProvider, IngestionPipeline, IngestionStatusStore};
use hybridrag_retrieval::LlmClient;
use hybridrag_vectorstore::VectorStore;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::pg_store::PgGraphStore;

/// Clones cheaply (every field is an `Arc` or `Copy`), so handlers receive
/// it by value via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub graph_store: Arc<PgGraphStore>,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmClient>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub graph_cache: Arc<RepoGraphCache>,
    pub ingestion_status: Arc<IngestionStatusStore>,
    pub pipeline: Arc<IngestionPipeline>,
    /// Serializes concurrent ingestion for the same `repo_id` (Open
    /// Question #1: "serialize by repo_id"). One lock per repo, created
    /// lazily and kept for the process lifetime.
    pub repo_locks: Arc<DashMap<Uuid, Arc<AsyncMutex<()>>>>,
    /// Scratch directory repo clones land in before extraction.
    pub clone_dir: PathBuf,
}

impl AppState {
    pub fn repo_lock(&self, repo_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.repo_locks.entry(repo_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    create_tokenizer("word-count")
}

pub async fn run_migrations(pool: &PgPool, graph_store: &PgGraphStore, vector_store: &hybridrag_vectorstore::PgVectorStore, embedding_dim: usize) -> Result<()> {
    let _ = pool;
    graph_store.ensure_schema().await?;
    vector_store.ensure_schema(embedding_dim).await?;
    Ok(())
}
