//! Route registration. One module per external-interface group:
//! ingestion, graph read, retrieval, and the raw vector-store surface.

pub mod graph;
pub mod ingest;
pub mod retrieval;
pub mod vectors;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/ingest/file", post(ingest::ingest_file))
        .route("/v1/ingest-repo", post(ingest::ingest_repo))
        .route("/v1/ingest/{id}", get(ingest::get_ingestion_status))
        .route("/v1/ingest-repo/{id}", get(ingest::get_ingestion_status))
        .route("/v1/repos", get(ingest::list_repos))
        .route("/v1/summary", post(ingest::update_summary))
        .route("/v1/graph/repos/{repo_id}/nodes", get(graph::repo_nodes))
        .route("/v1/graph/repos/{repo_id}", get(graph::repo_graph))
        .route("/v1/graph/docs/{document_id}/relationships", get(graph::document_relationships))
        .route("/v1/rag", post(retrieval::rag))
        .route("/v1/rag/simple", post(retrieval::rag_simple))
        .route("/v1/vectors/batch", post(vectors::batch_add))
        .route("/v1/vectors/search", post(vectors::search))
        .route("/v1/vectors/search-by-doc", post(vectors::search_by_doc))
        .route("/v1/vectors/by-ingestion/{id}", delete(vectors::delete_by_ingestion))
        .with_state(state)
}
