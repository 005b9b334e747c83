//! Persistence seam for `DocumentNode`/`DocumentRelationship` rows. Kept
//! separate from `hybridrag-vectorstore::VectorStore` since the ordering
//! contract (node-commit before relationship-commit before chunk-commit)
//! spans both stores and the pipeline needs to call them in sequence
//! regardless of backend.

use async_trait::async_trait;
use hybridrag_core::chunk::{DocumentNode, DocumentRelationship};
use hybridrag_core::error::Result;
use uuid::Uuid;

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_document_node(&self, node: DocumentNode) -> Result<()>;
    async fn upsert_document_relationship(&self, rel: DocumentRelationship) -> Result<()>;
    async fn find_document_id_by_canonical_id(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>>;
}
