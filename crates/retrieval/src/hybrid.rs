//! `run_rag` — the repo-aware hybrid retrieval pipeline: filtered vector
//! search with an unfiltered fallback, seed canonical_id extraction,
//! intent-driven graph traversal from the longest seed id, canonical_id ->
//! document_id resolution, missing-chunk hydration, deterministic context
//! assembly under a word-count token budget, then the LLM call.

use crate::agent_adapter::prepare_chunks_for_agent;
use crate::llm::{LlmClient, LlmRequest};
use hybridrag_core::config::get_settings;
use hybridrag_core::error::Result;
use hybridrag_core::retrieval_plan::RetrievalPlan;
use hybridrag_core::tokenizer::Tokenizer;
use hybridrag_graph::{execute_traversals, select_traversal_strategies, RepoGraphCache};
use hybridrag_ingest::EmbeddingProvider;
use hybridrag_vectorstore::{MetadataFilter, MetadataPredicate, SearchResult, VectorStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Resolves a `canonical_id` to the `document_id` persisted for it within a
/// repo. Implemented against the same persistence backend `GraphStore`
/// writes to — the graph export API hybrid retrieval uses to turn expanded
/// canonical_ids back into documents.
#[async_trait::async_trait]
pub trait CanonicalIdResolver: Send + Sync {
    async fn resolve(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalPlanSummary {
    pub seed_canonical_ids: Vec<String>,
    pub expanded_canonical_ids: Vec<String>,
    pub seed_docs: usize,
    pub expanded_docs: usize,
    pub total_docs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Uuid>,
    pub repo_id: Uuid,
    pub retrieval_plan: RetrievalPlanSummary,
}

pub struct HybridRetrievalRequest<'a> {
    pub query: &'a str,
    pub repo_id: Uuid,
    pub top_k: usize,
    pub provider: Option<String>,
    pub model: Option<String>,
}

fn extract_canonical_id(metadata: &HashMap<String, serde_json::Value>) -> Option<String> {
    if let Some(v) = metadata.get("canonical_id").and_then(|v| v.as_str()) {
        return Some(v.to_string());
    }
    metadata.get("source_metadata").and_then(|v| v.get("canonical_id")).and_then(|v| v.as_str()).map(str::to_string)
}

fn extract_document_id(chunk: &SearchResult) -> Option<Uuid> {
    chunk.document_id
}

/// Embed, then vector-search filtered to `doc_type = "code"`; if that
/// returns nothing, retry unfiltered. Keeps code-heavy queries from missing
/// relevant prose when the repo's code chunks don't cover the query.
async fn search_with_code_fallback(vector_store: &dyn VectorStore, query_vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
    let mut filter: MetadataFilter = HashMap::new();
    filter.insert("doc_type".to_string(), MetadataPredicate::Eq(serde_json::json!("code")));

    let filtered = vector_store.similarity_search(query_vector, k, Some(&filter)).await?;
    if !filtered.is_empty() {
        return Ok(filtered);
    }
    debug!("code-filtered search returned nothing, falling back to unfiltered retrieval");
    vector_store.similarity_search(query_vector, k, None).await
}

/// Append chunk text to `context` until the tokenizer's word-count budget
/// would be exceeded; stops (hard `break`, not a skip-and-continue) at the
/// first chunk that would overflow.
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

/// The 8-step repo-aware hybrid retrieval pipeline.
#[allow(clippy::too_many_arguments)]
pub async fn run_rag(
    request: HybridRetrievalRequest<'_>,
    embedder: &dyn EmbeddingProvider,
    vector_store: &dyn VectorStore,
    graph_cache: &RepoGraphCache,
    resolver: &dyn CanonicalIdResolver,
    llm: &dyn LlmClient,
    tokenizer: &dyn Tokenizer,
) -> Result<RagResponse> {
    let settings = get_settings();

    // 1. Embed the query.
    let query_vector = embedder.embed(request.query).await?;

    // 2. Filtered vector search with unfiltered fallback.
    let seed_chunks = search_with_code_fallback(vector_store, &query_vector, request.top_k).await?;

    // 3. Seed canonical_ids + the document_ids already present in the seed set.
    let mut seed_canonical_ids: Vec<String> = seed_chunks.iter().filter_map(|c| extract_canonical_id(&c.metadata)).collect();
    seed_canonical_ids.sort();
    seed_canonical_ids.dedup();

    let mut chunks_by_document: HashMap<Uuid, Vec<SearchResult>> = HashMap::new();
    let mut seed_document_order: Vec<Uuid> = Vec::new();
    for chunk in &seed_chunks {
        if let Some(document_id) = extract_document_id(chunk) {
            if !chunks_by_document.contains_key(&document_id) {
                seed_document_order.push(document_id);
            }
            chunks_by_document.entry(document_id).or_default().push(chunk.clone());
        }
    }
    let seed_document_ids: HashSet<Uuid> = seed_document_order.iter().copied().collect();

    // 4. Load the cached CodebaseGraph, pick the longest seed canonical_id
    //    as the traversal start, and run the intent-selected strategies.
    let expanded_canonical_ids: Vec<String> = if let Some(start) = seed_canonical_ids.iter().max_by_key(|id| id.len()) {
        let graph = graph_cache.get(request.repo_id);
        match graph {
            Some(graph) if graph.contains(start) => {
                let strategies = select_traversal_strategies(request.query);
                execute_traversals(&graph, start, &strategies).into_iter().map(|n| n.canonical_id).collect()
            }
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    };

    // 5. Resolve (seed ∪ expanded) canonical_ids -> document_ids, and find
    //    which expanded documents are still missing from the seed set.
    let mut missing_document_ids: Vec<Uuid> = Vec::new();
    let mut seen_missing: HashSet<Uuid> = HashSet::new();
    for canonical_id in &expanded_canonical_ids {
        if let Some(document_id) = resolver.resolve(request.repo_id, canonical_id).await? {
            if !seed_document_ids.contains(&document_id) && seen_missing.insert(document_id) {
                missing_document_ids.push(document_id);
            }
        }
    }

    // 6. Hydrate each missing expanded document's chunks.
    let mut expanded_document_order: Vec<Uuid> = Vec::new();
    for document_id in &missing_document_ids {
        let chunks = vector_store.get_chunks_by_document_id(*document_id, settings.max_chunks_per_document).await?;
        if !chunks.is_empty() {
            expanded_document_order.push(*document_id);
            chunks_by_document.insert(*document_id, chunks);
        }
    }

    // 7. Build the plan (seeds only; expansion provenance lives in the
    //    summary, not the plan, since expansion here was canonical-id
    //    based rather than document-id DFS) and flatten the already-fetched
    //    chunk map in seed-then-expanded order.
    let plan = RetrievalPlan::new(seed_document_ids.iter().map(|id| id.to_string()).collect());

    let document_order: Vec<Uuid> = seed_document_order.into_iter().chain(expanded_document_order).collect();
    let agent_chunks = prepare_chunks_for_agent(&document_order, &chunks_by_document, settings.max_chunks_per_document, request.top_k.max(settings.max_chunks_per_document));

    // 8. Word-count-budgeted context assembly, then the LLM call.
    let context = assemble_context(&agent_chunks, tokenizer, settings.max_total_tokens);
    let sources: Vec<Uuid> = agent_chunks.iter().map(|c| c.document_id).collect();

    info!(repo_id = %request.repo_id, seed_docs = document_order.len(), "running hybrid retrieval");

    let answer = llm
        .complete(LlmRequest { context, query: request.query.to_string(), provider: request.provider, model: request.model })
        .await?;

    Ok(RagResponse {
        answer,
        sources,
        repo_id: request.repo_id,
        retrieval_plan: RetrievalPlanSummary {
            seed_docs: plan.seed_document_ids.len(),
            expanded_docs: missing_document_ids.len(),
            total_docs: document_order.len(),
            seed_canonical_ids,
            expanded_canonical_ids,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::tokenizer::WordCountTokenizer;
    use hybridrag_graph::CodebaseGraph;
    use hybridrag_ingest::DeterministicEmbeddingProvider;
    use hybridrag_vectorstore::{InMemoryVectorStore, VectorRecord};
    use std::sync::Mutex;

    struct FakeResolver {
        map: HashMap<(Uuid, String), Uuid>,
    }

    #[async_trait::async_trait]
    impl CanonicalIdResolver for FakeResolver {
        async fn resolve(&self, repo_id: Uuid, canonical_id: &str) -> Result<Option<Uuid>> {
            Ok(self.map.get(&(repo_id, canonical_id.to_string())).copied())
        }
    }

    struct RecordingLlm {
        last_context: Mutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, request: LlmRequest) -> Result<String> {
            *self.last_context.lock().unwrap() = Some(request.context);
            Ok("the answer".to_string())
        }
    }

    #[tokio::test]
    async fn falls_back_to_unfiltered_search_when_code_filter_is_empty() {
        let repo_id = Uuid::new_v4();
        let store = InMemoryVectorStore::new();
        let doc_id = Uuid::new_v4();
        store
            .add(vec![VectorRecord {
                chunk_id: "c1".to_string(),
                vector: vec![1.0, 0.0],
                chunk_text: "general content".to_string(),
                document_id: Some(doc_id),
                ingestion_id: Uuid::new_v4(),
                chunk_index: 0,
                chunk_strategy: "fixed_char".to_string(),
                provider: "test".to_string(),
                metadata: HashMap::from([("doc_type".to_string(), serde_json::json!("document"))]),
            }])
            .await
            .unwrap();

        let embedder = DeterministicEmbeddingProvider { dimensions: 2 };
        let graph_cache = RepoGraphCache::new();
        graph_cache.get_or_insert_with(repo_id, CodebaseGraph::new);
        let resolver = FakeResolver { map: HashMap::new() };
        let llm = RecordingLlm { last_context: Mutex::new(None) };
        let tokenizer = WordCountTokenizer;

        let response = run_rag(
            HybridRetrievalRequest { query: "what does this do", repo_id, top_k: 5, provider: None, model: None },
            &embedder,
            &store,
            &graph_cache,
            &resolver,
            &llm,
            &tokenizer,
        )
        .await
        .unwrap();

        assert_eq!(response.answer, "the answer");
        assert_eq!(response.sources, vec![doc_id]);
        assert_eq!(response.retrieval_plan.seed_docs, 1);
    }
}
