//! Shared model for the hybrid vector+graph RAG core: canonical identity,
//! the artifact/relationship algebra, the retrieval-plan algebra, the
//! persisted-row chunk schema, error types, config, and token counting.

pub mod artifact;
pub mod chunk;
pub mod config;
pub mod error;
pub mod identity;
pub mod retrieval_plan;
pub mod tokenizer;

pub use artifact::{Artifact, ArtifactKind, RelationType, Relationship};
pub use chunk::{Chunk, DocumentNode, DocumentRelationship, IngestionRequest, IngestionStatus, VectorChunk};
pub use error::{RagError, Result};
pub use retrieval_plan::{expand_retrieval_plan, ExpansionMetadata, OutgoingRelationship, PlanConstraints, RetrievalPlan};
