//! `POST /v1/rag` and `POST /v1/rag/simple`. Wires
//! `hybridrag-retrieval::{run_rag, run_simple_rag}` against the shared
//! `AppState`.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{bad_request, ApiError};
use crate::ingest_repo::load_codebase_graph;
use crate::state::AppState;
use hybridrag_retrieval::{run_rag, run_simple_rag, HybridRetrievalRequest, RagResponse, SimpleRagResponse, SimpleRetrievalRequest};

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    query: String,
    repo_id: Option<Uuid>,
    top_k: Option<usize>,
    provider: Option<String>,
    model: Option<String>,
}

/// The repo-aware pipeline needs a concrete `repo_id`; there is no "default
/// repo" concept in the data model (multiple repos can coexist with none
/// designated primary), so an omitted `repo_id` is a validation failure
/// rather than an implicit pick.
pub async fn rag(State(state): State<AppState>, Json(request): Json<RagRequest>) -> Result<Json<RagResponse>, ApiError> {
    let repo_id = request.repo_id.ok_or_else(|| bad_request("repo_id is required"))?;
    let top_k = request.top_k.unwrap_or_else(|| hybridrag_core::config::get_settings().default_top_k);

    if state.graph_cache.get(repo_id).is_none() {
        let graph = load_codebase_graph(&state.graph_store, repo_id).await?;
        state.graph_cache.get_or_insert_with(repo_id, || graph);
    }

    let response = run_rag(
        HybridRetrievalRequest { query: &request.query, repo_id, top_k, provider: request.provider, model: request.model },
        state.embedder.as_ref(),
        state.vector_store.as_ref(),
        state.graph_cache.as_ref(),
        state.graph_store.as_ref(),
        state.llm.as_ref(),
        state.tokenizer.as_ref(),
    )
    .await?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SimpleRagRequest {
    query: String,
    top_k: Option<usize>,
    provider: Option<String>,
    model: Option<String>,
}

pub async fn rag_simple(State(state): State<AppState>, Json(request): Json<SimpleRagRequest>) -> Result<Json<SimpleRagResponse>, ApiError> {
    let top_k = request.top_k.unwrap_or_else(|| hybridrag_core::config::get_settings().default_top_k);

    let response = run_simple_rag(
        SimpleRetrievalRequest { query: &request.query, top_k, provider: request.provider, model: request.model },
        state.embedder.as_ref(),
        state.vector_store.as_ref(),
        state.graph_store.as_ref(),
        state.llm.as_ref(),
        state.tokenizer.as_ref(),
    )
    .await?;

    Ok(Json(response))
}
