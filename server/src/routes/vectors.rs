//! Raw vector-store HTTP surface (`/v1/vectors/*`) — a thin pass-through
//! to `hybridrag_vectorstore::VectorStore`, used by collaborators that
//! chunk/embed upstream (e.g. the PDF pipeline) and just need somewhere to
//! persist records.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{bad_request, ApiError};
use crate::state::AppState;
use hybridrag_vectorstore::{MetadataFilter, SearchResult, VectorRecord};

#[derive(Debug, Deserialize)]
pub struct RecordInput {
    vector: Vec<f32>,
    chunk_id: String,
    chunk_text: String,
    document_id: Option<Uuid>,
    ingestion_id: Uuid,
    chunk_index: i32,
    chunk_strategy: String,
    provider: String,
    #[serde(default)]
    source_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    records: Vec<RecordInput>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    status: &'static str,
    count: usize,
}

pub async fn batch_add(State(state): State<AppState>, Json(request): Json<BatchRequest>) -> Result<Json<BatchResponse>, ApiError> {
    let count = request.records.len();
    let records: Vec<VectorRecord> = request
        .records
        .into_iter()
        .map(|r| {
            let mut metadata: HashMap<String, Value> = HashMap::new();
            if let Some(source_metadata) = r.source_metadata {
                metadata.insert("source_metadata".to_string(), source_metadata);
            }
            VectorRecord {
                chunk_id: r.chunk_id,
                vector: r.vector,
                chunk_text: r.chunk_text,
                document_id: r.document_id,
                ingestion_id: r.ingestion_id,
                chunk_index: r.chunk_index,
                chunk_strategy: r.chunk_strategy,
                provider: r.provider,
                metadata,
            }
        })
        .collect();

    state.vector_store.add(records).await?;
    Ok(Json(BatchResponse { status: "ok", count }))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    query_vector: Vec<f32>,
    k: usize,
    metadata_filter: Option<MetadataFilter>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    results: Vec<SearchResult>,
}

pub async fn search(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let results = state.vector_store.similarity_search(&request.query_vector, request.k, request.metadata_filter.as_ref()).await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Debug, Deserialize)]
pub struct SearchByDocRequest {
    document_id: Uuid,
    k: usize,
}

pub async fn search_by_doc(State(state): State<AppState>, Json(request): Json<SearchByDocRequest>) -> Result<Json<SearchResponse>, ApiError> {
    let results = state.vector_store.get_chunks_by_document_id(request.document_id, request.k).await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    status: &'static str,
}

pub async fn delete_by_ingestion(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<DeleteResponse>, ApiError> {
    let ingestion_id = Uuid::parse_str(&id).map_err(|_| bad_request("id must be a valid UUID"))?;
    state.vector_store.delete_by_ingestion_id(ingestion_id).await?;
    Ok(Json(DeleteResponse { status: "ok" }))
}
