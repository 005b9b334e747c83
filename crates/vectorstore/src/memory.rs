//! In-process `VectorStore` implementation, used by tests and the
//! in-memory server profile.

use crate::store::{cosine_similarity, matches_filter, MetadataFilter, SearchResult, VectorRecord, VectorStore};
use async_trait::async_trait;
use hybridrag_core::error::Result;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, new_records: Vec<VectorRecord>) -> Result<()> {
        self.records.write().unwrap().extend(new_records);
        Ok(())
    }

    async fn similarity_search(&self, query_vector: &[f32], k: usize, metadata_filter: Option<&MetadataFilter>) -> Result<Vec<SearchResult>> {
        let records = self.records.read().unwrap();
        let mut scored: Vec<SearchResult> = records
            .iter()
            .filter(|r| metadata_filter.map(|f| matches_filter(&r.metadata, f)).unwrap_or(true))
            .map(|r| SearchResult {
                chunk_id: r.chunk_id.clone(),
                text: r.chunk_text.clone(),
                document_id: r.document_id,
                score: cosine_similarity(query_vector, &r.vector),
                metadata: r.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_chunks_by_document_id(&self, document_id: Uuid, k: usize) -> Result<Vec<SearchResult>> {
        let records = self.records.read().unwrap();
        let mut matches: Vec<(i32, SearchResult)> = records
            .iter()
            .filter(|r| r.document_id == Some(document_id))
            .map(|r| {
                (
                    r.chunk_index,
                    SearchResult {
                        chunk_id: r.chunk_id.clone(),
                        text: r.chunk_text.clone(),
                        document_id: r.document_id,
                        score: 1.0,
                        metadata: r.metadata.clone(),
                    },
                )
            })
            .collect();
        matches.sort_by_key(|(idx, _)| *idx);
        matches.truncate(k);
        Ok(matches.into_iter().map(|(_, r)| r).collect())
    }

    async fn delete_by_ingestion_id(&self, ingestion_id: Uuid) -> Result<()> {
        self.records.write().unwrap().retain(|r| r.ingestion_id != ingestion_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn record(chunk_id: &str, vector: Vec<f32>, document_id: Uuid, chunk_index: i32, metadata: HashMap<String, serde_json::Value>) -> VectorRecord {
        VectorRecord {
            chunk_id: chunk_id.to_string(),
            vector,
            chunk_text: format!("text for {chunk_id}"),
            document_id: Some(document_id),
            ingestion_id: Uuid::new_v4(),
            chunk_index,
            chunk_strategy: "fixed_char".to_string(),
            provider: "test".to_string(),
            metadata,
        }
    }

    #[tokio::test]
    async fn similarity_search_ranks_by_cosine_score() {
        let store = InMemoryVectorStore::new();
        let doc = Uuid::new_v4();
        store
            .add(vec![
                record("a", vec![1.0, 0.0], doc, 0, HashMap::new()),
                record("b", vec![0.0, 1.0], doc, 1, HashMap::new()),
            ])
            .await
            .unwrap();

        let results = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(results[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn similarity_search_applies_metadata_filter() {
        let store = InMemoryVectorStore::new();
        let doc = Uuid::new_v4();
        let mut code_meta = HashMap::new();
        code_meta.insert("doc_type".to_string(), json!("code"));
        store.add(vec![record("a", vec![1.0, 0.0], doc, 0, code_meta)]).await.unwrap();

        let mut filter: MetadataFilter = HashMap::new();
        filter.insert("doc_type".to_string(), crate::store::MetadataPredicate::Eq(json!("document")));
        let results = store.similarity_search(&[1.0, 0.0], 5, Some(&filter)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn get_chunks_by_document_id_orders_by_chunk_index() {
        let store = InMemoryVectorStore::new();
        let doc = Uuid::new_v4();
        store
            .add(vec![
                record("second", vec![0.0, 1.0], doc, 1, HashMap::new()),
                record("first", vec![1.0, 0.0], doc, 0, HashMap::new()),
            ])
            .await
            .unwrap();

        let results = store.get_chunks_by_document_id(doc, 10).await.unwrap();
        assert_eq!(results.iter().map(|r| r.chunk_id.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn delete_by_ingestion_id_removes_only_matching_records() {
        let store = InMemoryVectorStore::new();
        let doc = Uuid::new_v4();
        let mut rec = record("a", vec![1.0, 0.0], doc, 0, HashMap::new());
        let ingestion_id = Uuid::new_v4();
        rec.ingestion_id = ingestion_id;
        store.add(vec![rec]).await.unwrap();

        store.delete_by_ingestion_id(ingestion_id).await.unwrap();
        let results = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
