//! Chunking strategy selection, embedding provider abstraction, the
//! three-entry-point ingestion pipeline, and the fire-and-forget
//! background ingestion worker.

pub mod chunking;
pub mod embedding;
pub mod graph_store;
pub mod pipeline;
pub mod worker;

pub use chunking::{choose_chunker, Chunker, FixedWindowChunker, ParagraphChunker, SentenceChunker};
pub use embedding::{DeterministicEmbeddingProvider, EmbeddingProvider, FastEmbedProvider};
pub use graph_store::GraphStore;
pub use pipeline::IngestionPipeline;
pub use worker::{spawn_ingestion, IngestionStatusRecord, IngestionStatusStore};
