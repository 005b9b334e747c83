//! Graph read surface: node lookup by canonical_id, the full repo graph
//! export, and per-document relationship listing over `GET /v1/graph/*`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{bad_request, ApiError};
use crate::pg_store_ext::NodeSummary;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CanonicalIdsQuery {
    canonical_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NodesResponse {
    nodes: Vec<NodeSummary>,
    total: usize,
}

pub async fn repo_nodes(State(state): State<AppState>, Path(repo_id): Path<Uuid>, Query(query): Query<CanonicalIdsQuery>) -> Result<Json<NodesResponse>, ApiError> {
    let canonical_ids: Vec<String> = query.canonical_ids.map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()).unwrap_or_default();

    let nodes = state.graph_store.nodes_for_canonical_ids(repo_id, &canonical_ids).await?;
    let nodes: Vec<NodeSummary> = nodes.into_iter().map(Into::into).collect();
    let total = nodes.len();
    Ok(Json(NodesResponse { nodes, total }))
}

#[derive(Debug, Serialize)]
pub struct RelationshipEdge {
    to_canonical_id: String,
    relation_type: String,
}

#[derive(Debug, Serialize)]
pub struct RepoGraphResponse {
    nodes: Vec<NodeSummary>,
    relationships: HashMap<String, Vec<RelationshipEdge>>,
    total_nodes: usize,
}

pub async fn repo_graph(State(state): State<AppState>, Path(repo_id): Path<Uuid>) -> Result<Json<RepoGraphResponse>, ApiError> {
    let nodes = state.graph_store.nodes_for_repo(repo_id).await?;
    let (_, edges) = state.graph_store.graph_export(repo_id).await?;

    let mut relationships: HashMap<String, Vec<RelationshipEdge>> = HashMap::new();
    for (from_cid, to_cid, relation_type) in edges {
        relationships.entry(from_cid).or_default().push(RelationshipEdge { to_canonical_id: to_cid, relation_type });
    }

    let total_nodes = nodes.len();
    Ok(Json(RepoGraphResponse { nodes, relationships, total_nodes }))
}

#[derive(Debug, Serialize)]
pub struct DocRelationship {
    target_document_id: Uuid,
    relation_type: String,
}

#[derive(Debug, Serialize)]
pub struct DocRelationshipsResponse {
    document_id: Uuid,
    relationships: Vec<DocRelationship>,
    total: usize,
}

pub async fn document_relationships(State(state): State<AppState>, Path(document_id): Path<String>) -> Result<Json<DocRelationshipsResponse>, ApiError> {
    let document_id = Uuid::parse_str(&document_id).map_err(|_| bad_request("document_id must be a valid UUID"))?;
    let edges = state.graph_store.relationships_for_document(document_id).await?;
    let relationships: Vec<DocRelationship> = edges.into_iter().map(|(to, rel)| DocRelationship { target_document_id: to, relation_type: rel.as_str().to_string() }).collect();
    let total = relationships.len();
    Ok(Json(DocRelationshipsResponse { document_id, relationships, total }))
}
