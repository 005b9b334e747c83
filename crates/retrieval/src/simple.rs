//! `run_simple_rag` — the document-only retrieval pipeline behind
//! `/v1/rag/simple`: vector search excluding `source_type = "code"`, a
//! seed `RetrievalPlan`, `expand_retrieval_plan` with `max_depth: 1,
//! allowed_relation_types: {DEFINES}`, then the same agent-adapter
//! flattening and word-count token budget `run_rag` uses.

use crate::agent_adapter::prepare_chunks_for_agent;
use crate::llm::{LlmClient, LlmRequest};
use async_trait::async_trait;
use hybridrag_core::artifact::RelationType;
use hybridrag_core::config::get_settings;
use hybridrag_core::error::Result;
use hybridrag_core::retrieval_plan::{expand_retrieval_plan, OutgoingRelationship, PlanConstraints, RetrievalPlan};
use hybridrag_core::tokenizer::Tokenizer;
use hybridrag_vectorstore::{MetadataFilter, MetadataPredicate, SearchResult, TaggedPredicate, VectorStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

/// The document-relationship collaborator `expand_retrieval_plan` walks:
/// "list a document's outgoing relationships" against the persisted
/// `document_relationships` table, independent of the canonical-id graph
/// `run_rag` uses.
#[async_trait]
pub trait DocumentRelationshipLister: Send + Sync {
    async fn list_outgoing(&self, document_id: Uuid) -> Result<Vec<OutgoingRelationship>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleRagResponse {
    pub answer: String,
    pub sources: Vec<Uuid>,
}

pub struct SimpleRetrievalRequest<'a> {
    pub query: &'a str,
    pub top_k: usize,
    pub provider: Option<String>,
    pub model: Option<String>,
}

fn code_exclusion_filter() -> MetadataFilter {
    let mut filter: MetadataFilter = HashMap::new();
    filter.insert("source_type".to_string(), MetadataPredicate::Tagged(TaggedPredicate { ne: Some(serde_json::json!("code")), in_: None }));
    filter
}

fn assemble_context(chunks: &[crate::agent_adapter::AgentChunk], tokenizer: &dyn Tokenizer, max_tokens: usize) -> String {
    let mut context = String::new();
    for chunk in chunks {
        let candidate = if context.is_empty() { chunk.text.clone() } else { format!("{context}\n\n{}", chunk.text) };
        if tokenizer.count_tokens(&candidate) > max_tokens {
            break;
        }
        context = candidate;
    }
    context
}

/// The document-only retrieval pipeline: vector search (code excluded) →
/// seed plan → one-hop DEFINES expansion over `document_relationships` →
/// hydrate expanded documents → flatten → LLM call.
pub async fn run_simple_rag(
    request: SimpleRetrievalRequest<'_>,
    embedder: &dyn hybridrag_ingest::EmbeddingProvider,
    vector_store: &dyn VectorStore,
    relationships: &dyn DocumentRelationshipLister,
    llm: &dyn LlmClient,
    tokenizer: &dyn Tokenizer,
) -> Result<SimpleRagResponse> {
    let settings = get_settings();

    let query_vector = embedder.embed(request.query).await?;
    let filter = code_exclusion_filter();
    let seed_chunks = vector_store.similarity_search(&query_vector, request.top_k, Some(&filter)).await?;

    let mut chunks_by_document: HashMap<Uuid, Vec<SearchResult>> = HashMap::new();
    let mut seed_document_order: Vec<Uuid> = Vec::new();
    for chunk in &seed_chunks {
        let Some(document_id) = chunk.document_id else { continue };
        if !chunks_by_document.contains_key(&document_id) {
            seed_document_order.push(document_id);
        }
        chunks_by_document.entry(document_id).or_default().push(chunk.clone());
    }
    let seed_document_ids: HashSet<String> = seed_document_order.iter().map(|id| id.to_string()).collect();

    let seed_plan = RetrievalPlan::new(seed_document_ids);
    let constraints = PlanConstraints { max_depth: 1, allowed_relation_types: Some([RelationType::Defines].into_iter().collect()), allow_bidirectional: false };

    // `expand_retrieval_plan` takes a synchronous callback; since the
    // underlying relationship listing is async, pre-fetch each seed's
    // outgoing edges before handing the closure a plain in-memory lookup.
    let mut prefetched: HashMap<String, Vec<OutgoingRelationship>> = HashMap::new();
    for document_id in &seed_plan.seed_document_ids {
        if let Ok(document_id) = Uuid::parse_str(document_id) {
            let outgoing = relationships.list_outgoing(document_id).await?;
            prefetched.insert(document_id.to_string(), outgoing);
        }
    }

    let plan = expand_retrieval_plan(&seed_plan, |doc_id| prefetched.get(doc_id).cloned().unwrap_or_default(), &constraints);

    let mut expanded_document_order: Vec<Uuid> = Vec::new();
    let mut expanded_ids: Vec<&String> = plan.expanded_document_ids.iter().collect();
    expanded_ids.sort();
    for document_id_str in expanded_ids {
        let Ok(document_id) = Uuid::parse_str(document_id_str) else { continue };
        let chunks = vector_store.get_chunks_by_document_id(document_id, settings.max_chunks_per_document).await?;
        if !chunks.is_empty() {
            expanded_document_order.push(document_id);
            chunks_by_document.insert(document_id, chunks);
        }
    }

    let document_order: Vec<Uuid> = seed_document_order.into_iter().chain(expanded_document_order).collect();
    let agent_chunks = prepare_chunks_for_agent(&document_order, &chunks_by_document, settings.max_chunks_per_document, request.top_k.max(settings.max_chunks_per_document));

    let context = assemble_context(&agent_chunks, tokenizer, settings.max_total_tokens);
    let sources: Vec<Uuid> = agent_chunks.iter().map(|c| c.document_id).collect();

    info!(seed_docs = document_order.len(), "running simple document retrieval");

    let answer = llm
        .complete(LlmRequest { context, query: request.query.to_string(), provider: request.provider, model: request.model })
        .await?;

    Ok(SimpleRagResponse { answer, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_ingest::DeterministicEmbeddingProvider;
    use hybridrag_core::tokenizer::WordCountTokenizer;
    use hybridrag_vectorstore::{InMemoryVectorStore, VectorRecord};

    struct NoRelationships;

    #[async_trait]
    impl DocumentRelationshipLister for NoRelationships {
        async fn list_outgoing(&self, _document_id: Uuid) -> Result<Vec<OutgoingRelationship>> {
            Ok(Vec::new())
        }
    }

    struct FixedLlm;

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _request: LlmRequest) -> Result<String> {
            Ok("doc answer".to_string())
        }
    }

    #[tokio::test]
    async fn excludes_code_chunks_from_seed_search() {
        let store = InMemoryVectorStore::new();
        let code_doc = Uuid::new_v4();
        let text_doc = Uuid::new_v4();
        store
            .add(vec![
                VectorRecord {
                    chunk_id: "code1".to_string(),
                    vector: vec![1.0, 0.0],
                    chunk_text: "def foo(): pass".to_string(),
                    document_id: Some(code_doc),
                    ingestion_id: Uuid::new_v4(),
                    chunk_index: 0,
                    chunk_strategy: "fixed_char".to_string(),
                    provider: "test".to_string(),
                    metadata: HashMap::from([("source_type".to_string(), serde_json::json!("code"))]),
                },
                VectorRecord {
                    chunk_id: "doc1".to_string(),
                    vector: vec![1.0, 0.0],
                    chunk_text: "the document body".to_string(),
                    document_id: Some(text_doc),
                    ingestion_id: Uuid::new_v4(),
                    chunk_index: 0,
                    chunk_strategy: "fixed_char".to_string(),
                    provider: "test".to_string(),
                    metadata: HashMap::from([("source_type".to_string(), serde_json::json!("document"))]),
                },
            ])
            .await
            .unwrap();

        let embedder = DeterministicEmbeddingProvider { dimensions: 2 };
        let relationships = NoRelationships;
        let llm = FixedLlm;
        let tokenizer = WordCountTokenizer;

        let response = run_simple_rag(
            SimpleRetrievalRequest { query: "what is this document about", top_k: 5, provider: None, model: None },
            &embedder,
            &store,
            &relationships,
            &llm,
            &tokenizer,
        )
        .await
        .unwrap();

        assert_eq!(response.sources, vec![text_doc]);
        assert_eq!(response.answer, "doc answer");
    }
}
