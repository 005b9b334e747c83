//! Extra read queries for the graph HTTP surface (`GET /v1/graph/...`),
//! split from `pg_store.rs` only because they return route-shaped DTOs
//! rather than core types.

use hybridrag_core::chunk::DocumentNode;
use hybridrag_core::error::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::pg_store::PgGraphStore;

#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeSummary {
    pub document_id: Uuid,
    pub canonical_id: String,
    pub relative_path: String,
    pub title: String,
    pub doc_type: String,
}

impl From<DocumentNode> for NodeSummary {
    fn from(node: DocumentNode) -> Self {
        Self { document_id: node.document_id, canonical_id: node.canonical_id, relative_path: node.relative_path, title: node.title, doc_type: node.doc_type }
    }
}

fn map_err(e: sqlx::Error) -> hybridrag_core::error::RagError {
    hybridrag_core::error::RagError::Graph(e.to_string())
}

impl PgGraphStore {
    pub async fn nodes_for_repo(&self, repo_id: Uuid) -> Result<Vec<NodeSummary>> {
        let rows = sqlx::query(
            "SELECT document_id, canonical_id, relative_path, title, doc_type FROM document_nodes WHERE repo_id = $1 ORDER BY canonical_id",
        )
        .bind(repo_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(NodeSummary {
                    document_id: row.try_get("document_id").map_err(map_err)?,
                    canonical_id: row.try_get("canonical_id").map_err(map_err)?,
                    relative_path: row.try_get("relative_path").map_err(map_err)?,
                    title: row.try_get("title").map_err(map_err)?,
                    doc_type: row.try_get("doc_type").map_err(map_err)?,
                })
            })
            .collect()
    }
}
