//! Persisted-row schema: `DocumentNode`, `DocumentRelationship`,
//! `VectorChunk`, `IngestionRequest` — the shapes that cross the
//! vector-store/ingestion-pipeline boundary and land in Postgres.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Accepted,
    Running,
    Completed,
    Failed,
}

impl IngestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub ingestion_id: Uuid,
    pub source_type: String,
    pub ingestion_metadata: serde_json::Value,
    pub status: IngestionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

/// A persisted artifact, unique on `(repo_id, canonical_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub document_id: Uuid,
    pub repo_id: Uuid,
    pub canonical_id: String,
    pub relative_path: String,
    pub symbol_path: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub source: String,
    pub ingestion_id: Uuid,
    pub doc_type: String,
    pub text: Option<String>,
}

/// A persisted edge between two DocumentNodes. FK cascade-deletes from
/// either endpoint's DocumentNode; unique on the triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRelationship {
    pub id: Uuid,
    pub from_document_id: Uuid,
    pub to_document_id: Uuid,
    pub relation_type: String,
    pub relationship_metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// In-flight chunk, prior to embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    pub fn new(chunk_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { chunk_id: chunk_id.into(), content: content.into(), metadata: HashMap::new() }
    }
}

/// A persisted, embedded chunk — FK cascade from its DocumentNode when
/// `document_id` is set; deleted wholesale by `ingestion_id` on re-ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorChunk {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub document_id: Option<Uuid>,
    pub ingestion_id: Uuid,
    pub chunk_id: String,
    pub chunk_index: i32,
    pub chunk_strategy: String,
    pub chunk_text: String,
    pub source_metadata: serde_json::Value,
    pub provider: String,
}
