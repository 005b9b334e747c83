//! Deterministic plan executor: document order is seeds first then
//! expansions, each side sorted for determinism and de-duplicated. The
//! "no leakage" invariant rejects any chunk whose `document_id` doesn't
//! match the bucket it was fetched for — defends against a vector-store
//! implementation bug silently cross-contaminating buckets.

use hybridrag_core::retrieval_plan::RetrievalPlan;
use hybridrag_vectorstore::{SearchResult, VectorStore};
use std::collections::HashMap;
use uuid::Uuid;

/// `seeds ⧺ expanded`, each side sorted for determinism, with duplicates
/// (a document present in both sets) resolved to a single seed-side slot.
pub fn ordered_unique(plan: &RetrievalPlan) -> Vec<String> {
    let mut seeds: Vec<String> = plan.seed_document_ids.iter().cloned().collect();
    seeds.sort();
    let mut expanded: Vec<String> = plan.expanded_document_ids.iter().cloned().collect();
    expanded.sort();

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(seeds.len() + expanded.len());
    for id in seeds.into_iter().chain(expanded) {
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// Execute `plan` against `vector_store`, pulling up to
/// `top_k_per_document` chunks per document in `ordered_unique(plan)`
/// order. Returns `(document_order, chunks_by_document)` ready for
/// [`crate::agent_adapter::prepare_chunks_for_agent`].
pub async fn execute_retrieval_plan(
    plan: &RetrievalPlan,
    vector_store: &dyn VectorStore,
    top_k_per_document: usize,
) -> hybridrag_core::error::Result<(Vec<Uuid>, HashMap<Uuid, Vec<SearchResult>>)> {
    let mut document_order = Vec::new();
    let mut chunks_by_document = HashMap::new();

    for document_id_str in ordered_unique(plan) {
        let Ok(document_id) = Uuid::parse_str(&document_id_str) else { continue };

        let chunks = vector_store.get_chunks_by_document_id(document_id, top_k_per_document).await?;
        let clean: Vec<SearchResult> = chunks.into_iter().filter(|c| c.document_id == Some(document_id)).collect();

        document_order.push(document_id);
        chunks_by_document.insert(document_id, clean);
    }

    Ok((document_order, chunks_by_document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::retrieval_plan::RetrievalPlan;
    use hybridrag_vectorstore::{InMemoryVectorStore, VectorRecord};

    #[tokio::test]
    async fn ordered_unique_keeps_seeds_before_expanded_and_dedupes() {
        let mut plan = RetrievalPlan::new(["b".to_string(), "a".to_string()].into_iter().collect());
        plan.expanded_document_ids = ["a".to_string(), "c".to_string()].into_iter().collect();

        assert_eq!(ordered_unique(&plan), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn execute_plan_rejects_chunks_with_mismatched_document_id() {
        let store = InMemoryVectorStore::new();
        let doc = Uuid::new_v4();
        store
            .add(vec![VectorRecord {
                chunk_id: "c1".to_string(),
                vector: vec![1.0],
                chunk_text: "hello".to_string(),
                document_id: Some(doc),
                ingestion_id: Uuid::new_v4(),
                chunk_index: 0,
                chunk_strategy: "fixed_char".to_string(),
                provider: "test".to_string(),
                metadata: Default::default(),
            }])
            .await
            .unwrap();

        let plan = RetrievalPlan::new([doc.to_string()].into_iter().collect());
        let (order, chunks) = execute_retrieval_plan(&plan, &store, 5).await.unwrap();
        assert_eq!(order, vec![doc]);
        assert_eq!(chunks[&doc].len(), 1);
    }
}
