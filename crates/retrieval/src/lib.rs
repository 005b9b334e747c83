//! Hybrid vector+graph retrieval orchestration: the repo-aware and
//! document-only retrieval pipelines, traversal-result flattening, the
//! deterministic plan executor, and the LLM facade seam.

pub mod agent_adapter;
pub mod execute_plan;
pub mod hybrid;
pub mod llm;
pub mod simple;

pub use agent_adapter::{prepare_chunks_for_agent, AgentChunk};
pub use execute_plan::{execute_retrieval_plan, ordered_unique};
pub use hybrid::{run_rag, CanonicalIdResolver, HybridRetrievalRequest, RagResponse, RetrievalPlanSummary};
pub use llm::{HttpLlmClient, LlmClient, LlmRequest, NoopLlmClient};
pub use simple::{run_simple_rag, DocumentRelationshipLister, SimpleRagResponse, SimpleRetrievalRequest};
