//! `IngestionPipeline` — three entry points sharing one `chunk → embed →
//! persist` orchestration shape: `run` (fresh text document),
//! `run_with_chunks` (pre-chunked content, e.g. extracted PDF pages), and
//! `run_with_sections` (a markdown file split into one DocumentNode per
//! heading section, with DEFINES edges mirroring the heading hierarchy).

use crate::chunking::{choose_chunker, Chunker};
use crate::embedding::EmbeddingProvider;
use crate::graph_store::GraphStore;
use hybridrag_core::artifact::ArtifactKind;
use hybridrag_core::chunk::{Chunk, DocumentNode, DocumentRelationship};
use hybridrag_core::error::{RagError, Result};
use hybridrag_graph::extractors::MarkdownExtractor;
use hybridrag_vectorstore::{VectorRecord, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    graph_store: Arc<dyn GraphStore>,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, vector_store: Arc<dyn VectorStore>, graph_store: Arc<dyn GraphStore>) -> Self {
        Self { embedder, vector_store, graph_store }
    }

    fn new_document_node(
        repo_id: Uuid,
        canonical_id: &str,
        relative_path: &str,
        title: &str,
        source: &str,
        doc_type: &str,
        ingestion_id: Uuid,
        text: Option<String>,
    ) -> DocumentNode {
        DocumentNode {
            document_id: Uuid::new_v4(),
            repo_id,
            canonical_id: canonical_id.to_string(),
            relative_path: relative_path.to_string(),
            symbol_path: None,
            title: title.to_string(),
            summary: None,
            source: source.to_string(),
            ingestion_id,
            doc_type: doc_type.to_string(),
            text,
        }
    }

    async fn embed_and_persist(&self, document_id: Uuid, ingestion_id: Uuid, chunk_strategy: &str, mut chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.metadata.insert("chunk_index".to_string(), serde_json::json!(i));
            chunk.metadata.insert("document_id".to_string(), serde_json::json!(document_id.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Ingest(format!(
                "embedding count {} does not match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| VectorRecord {
                chunk_id: chunk.chunk_id,
                vector,
                chunk_text: chunk.content,
                document_id: Some(document_id),
                ingestion_id,
                chunk_index: i as i32,
                chunk_strategy: chunk_strategy.to_string(),
                provider: self.embedder.name().to_string(),
                metadata: chunk.metadata,
            })
            .collect();

        self.vector_store.add(records).await
    }

    /// Fresh text document: node-commit, then chunk-select (or use the
    /// caller-supplied chunker), embed, and persist.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        repo_id: Uuid,
        canonical_id: &str,
        relative_path: &str,
        title: &str,
        source: &str,
        doc_type: &str,
        text: &str,
        ingestion_id: Uuid,
        chunker: Option<Box<dyn Chunker>>,
    ) -> Result<DocumentNode> {
        let node = Self::new_document_node(repo_id, canonical_id, relative_path, title, source, doc_type, ingestion_id, Some(text.to_string()));
        self.graph_store.upsert_document_node(node.clone()).await?;

        let chunker = chunker.unwrap_or_else(|| choose_chunker(text));
        let chunks = chunker.chunk(text);
        self.embed_and_persist(node.document_id, ingestion_id, chunker.chunk_strategy(), chunks).await?;

        info!(document_id = %node.document_id, canonical_id, "ingested document");
        Ok(node)
    }

    /// Pre-chunked content (e.g. PDF pages already split upstream). Each
    /// chunk's provenance metadata (`chunk_index`, `document_id`) is
    /// injected the same way `run` injects it for freshly-chunked text.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_with_chunks(
        &self,
        repo_id: Uuid,
        canonical_id: &str,
        relative_path: &str,
        title: &str,
        source: &str,
        doc_type: &str,
        chunks: Vec<Chunk>,
        ingestion_id: Uuid,
    ) -> Result<DocumentNode> {
        let node = Self::new_document_node(repo_id, canonical_id, relative_path, title, source, doc_type, ingestion_id, None);
        self.graph_store.upsert_document_node(node.clone()).await?;

        self.embed_and_persist(node.document_id, ingestion_id, "external", chunks).await?;

        info!(document_id = %node.document_id, canonical_id, "ingested pre-chunked document");
        Ok(node)
    }

    /// A markdown file split into one DocumentNode per heading section.
    /// Strictly: all nodes commit, then all DEFINES relationships
    /// (mirroring the extractor's `parent_id` chain) commit, then each
    /// section's chunk is embedded and persisted individually.
    pub async fn run_with_sections(
        &self,
        repo_id: Uuid,
        relative_path: &str,
        source: &str,
        text: &str,
        ingestion_id: Uuid,
    ) -> Result<Vec<DocumentNode>> {
        let artifacts = MarkdownExtractor::new(relative_path, text).extract();

        let mut canonical_to_doc_id: HashMap<String, Uuid> = HashMap::new();
        let mut nodes = Vec::with_capacity(artifacts.len());

        for artifact in &artifacts {
            let doc_type = if artifact.kind == ArtifactKind::MarkdownModule { "markdown_module" } else { "markdown_section" };
            let node = Self::new_document_node(
                repo_id,
                &artifact.id,
                relative_path,
                &artifact.name,
                source,
                doc_type,
                ingestion_id,
                artifact.text.clone(),
            );
            canonical_to_doc_id.insert(artifact.id.clone(), node.document_id);
            self.graph_store.upsert_document_node(node.clone()).await?;
            nodes.push(node);
        }

        for artifact in &artifacts {
            let Some(parent_id) = &artifact.parent_id else { continue };
            let (Some(&from_doc_id), Some(&to_doc_id)) =
                (canonical_to_doc_id.get(parent_id), canonical_to_doc_id.get(&artifact.id))
            else {
                continue;
            };
            self.graph_store
                .upsert_document_relationship(DocumentRelationship {
                    id: Uuid::new_v4(),
                    from_document_id: from_doc_id,
                    to_document_id: to_doc_id,
                    relation_type: "DEFINES".to_string(),
                    relationship_metadata: serde_json::json!({}),
                    created_at: chrono::Utc::now(),
                })
                .await?;
        }

        for (artifact, node) in artifacts.iter().zip(&nodes) {
            let Some(text) = &artifact.text else { continue };
            if text.trim().is_empty() {
                continue;
            }
            let chunk = Chunk::new(Uuid::new_v4().to_string(), text.clone());
            self.embed_and_persist(node.document_id, ingestion_id, "section", vec![chunk]).await?;
        }

        info!(relative_path, section_count = nodes.len(), "ingested sectioned markdown document");
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DeterministicEmbeddingProvider;
    use async_trait::async_trait;
    use hybridrag_vectorstore::InMemoryVectorStore;
    use std::sync::RwLock;

    #[derive(Default)]
    struct FakeGraphStore {
        nodes: RwLock<Vec<DocumentNode>>,
        relationships: RwLock<Vec<DocumentRelationship>>,
    }

    #[async_trait]
    impl GraphStore for FakeGraphStore {
        async fn upsert_document_node(&self, node: DocumentNode) -> Result<()> {
            self.nodes.write().unwrap().push(node);
            Ok(())
        }

        async fn upsert_document_relationship(&self, rel: DocumentRelationship) -> Result<()> {
            self.relationships.write().unwrap().push(rel);
            Ok(())
        }

        async fn find_document_id_by_canonical_id(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>> {
            Ok(self
                .nodes
                .read()
                .unwrap()
                .iter()
                .find(|n| n.repo_id == repo_id && n.canonical_id == canonical_id)
                .map(|n| n.document_id))
        }
    }

    fn test_pipeline() -> (IngestionPipeline, Arc<InMemoryVectorStore>, Arc<FakeGraphStore>) {
        let embedder = Arc::new(DeterministicEmbeddingProvider { dimensions: 16 });
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let graph_store = Arc::new(FakeGraphStore::default());
        let pipeline = IngestionPipeline::new(embedder, vector_store.clone(), graph_store.clone());
        (pipeline, vector_store, graph_store)
    }

    #[tokio::test]
    async fn run_persists_node_before_chunks_are_embedded() {
        let (pipeline, vector_store, graph_store) = test_pipeline();
        let node = pipeline
            .run(Uuid::new_v4(), "doc.md", "doc.md", "Doc", "upload", "document", "hello world, this is a test.", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_eq!(graph_store.nodes.read().unwrap().len(), 1);
        let chunks = vector_store.get_chunks_by_document_id(node.document_id, 10).await.unwrap();
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn run_with_chunks_injects_document_id_into_metadata() {
        let (pipeline, vector_store, _graph_store) = test_pipeline();
        let chunks = vec![Chunk::new("c1", "page one text"), Chunk::new("c2", "page two text")];
        let node = pipeline.run_with_chunks(Uuid::new_v4(), "doc.pdf", "doc.pdf", "Doc", "upload", "document", chunks, Uuid::new_v4()).await.unwrap();

        let stored = vector_store.get_chunks_by_document_id(node.document_id, 10).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn run_with_sections_creates_defines_edges_for_nested_headings() {
        let (pipeline, _vector_store, graph_store) = test_pipeline();
        let text = "# Intro\n\nbody\n\n## Details\n\nmore body\n";
        let nodes = pipeline.run_with_sections(Uuid::new_v4(), "README.md", "upload", text, Uuid::new_v4()).await.unwrap();

        assert_eq!(nodes.len(), 3); // module + "Intro" + "Details"
        assert_eq!(graph_store.relationships.read().unwrap().len(), 2);
    }
}
