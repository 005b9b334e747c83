//! `VectorStore` trait and the metadata-filter predicate language: equality,
//! `ne`, and `in` predicates evaluated before ANN ranking.

use async_trait::async_trait;
use hybridrag_core::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub chunk_text: String,
    pub document_id: Option<Uuid>,
    pub ingestion_id: Uuid,
    pub chunk_index: i32,
    pub chunk_strategy: String,
    pub provider: String,
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub text: String,
    pub document_id: Option<Uuid>,
    pub score: f32,
    pub metadata: HashMap<String, Value>,
}

/// One metadata predicate. Equality is the implicit default when a plain
/// value is given in a filter map; `Ne`/`In` are the explicit forms.
///
/// `Tagged` is listed first: `serde(untagged)` tries variants in
/// declaration order and keeps the first that parses, and
/// `serde_json::Value` parses *any* JSON including an object — so if `Eq`
/// came first, `{"ne": "code"}` would always deserialize as
/// `Eq(Value::Object(..))` and the `Tagged` variant would be unreachable.
/// `TaggedPredicate`'s `deny_unknown_fields` makes an arbitrary metadata
/// object (one that isn't actually an `ne`/`in` predicate) fail to parse
/// as `Tagged` and fall through to `Eq`, as intended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataPredicate {
    Tagged(TaggedPredicate),
    Eq(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaggedPredicate {
    pub ne: Option<Value>,
    #[serde(rename = "in")]
    pub in_: Option<Vec<Value>>,
}

pub type MetadataFilter = HashMap<String, MetadataPredicate>;

/// Evaluate a filter against a record's metadata. A `{key: {"ne": v}}`
/// predicate treats an absent key as satisfying the predicate (not-equal
/// to anything, including absence) — this is what lets the document-only
/// retrieval path's `{source_type: {ne: "code"}}` filter include rows that
/// never set `source_type` at all.
pub fn matches_filter(metadata: &HashMap<String, Value>, filter: &MetadataFilter) -> bool {
    filter.iter().all(|(key, predicate)| match predicate {
        MetadataPredicate::Eq(expected) => metadata.get(key) == Some(expected),
        MetadataPredicate::Tagged(tagged) => {
            let actual = metadata.get(key);
            let ne_ok = tagged.ne.as_ref().map(|v| actual != Some(v)).unwrap_or(true);
            let in_ok = tagged.in_.as_ref().map(|values| actual.map(|a| values.contains(a)).unwrap_or(false)).unwrap_or(true);
            ne_ok && in_ok
        }
    })
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()>;

    async fn similarity_search(&self, query_vector: &[f32], k: usize, metadata_filter: Option<&MetadataFilter>) -> Result<Vec<SearchResult>>;

    async fn get_chunks_by_document_id(&self, document_id: Uuid, k: usize) -> Result<Vec<SearchResult>>;

    async fn delete_by_ingestion_id(&self, ingestion_id: Uuid) -> Result<()>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ne_predicate_matches_absent_key() {
        let metadata: HashMap<String, Value> = HashMap::new();
        let mut filter: MetadataFilter = HashMap::new();
        filter.insert(
            "source_type".to_string(),
            MetadataPredicate::Tagged(TaggedPredicate { ne: Some(json!("code")), in_: None }),
        );
        assert!(matches_filter(&metadata, &filter));
    }

    #[test]
    fn ne_predicate_excludes_matching_key() {
        let mut metadata = HashMap::new();
        metadata.insert("source_type".to_string(), json!("code"));
        let mut filter: MetadataFilter = HashMap::new();
        filter.insert(
            "source_type".to_string(),
            MetadataPredicate::Tagged(TaggedPredicate { ne: Some(json!("code")), in_: None }),
        );
        assert!(!matches_filter(&metadata, &filter));
    }

    #[test]
    fn eq_predicate_requires_exact_match() {
        let mut metadata = HashMap::new();
        metadata.insert("doc_type".to_string(), json!("code"));
        let mut filter: MetadataFilter = HashMap::new();
        filter.insert("doc_type".to_string(), MetadataPredicate::Eq(json!("code")));
        assert!(matches_filter(&metadata, &filter));

        filter.insert("doc_type".to_string(), MetadataPredicate::Eq(json!("file")));
        assert!(!matches_filter(&metadata, &filter));
    }

    #[test]
    fn ne_filter_deserializes_from_json_body_as_tagged_not_eq() {
        let filter: MetadataFilter = serde_json::from_value(json!({"source_type": {"ne": "code"}})).unwrap();
        assert!(matches!(filter.get("source_type"), Some(MetadataPredicate::Tagged(_))));

        let mut metadata = HashMap::new();
        metadata.insert("source_type".to_string(), json!("code"));
        assert!(!matches_filter(&metadata, &filter));
        assert!(matches_filter(&HashMap::new(), &filter));
    }

    #[test]
    fn in_filter_deserializes_from_json_body_as_tagged() {
        let filter: MetadataFilter = serde_json::from_value(json!({"doc_type": {"in": ["code", "document"]}})).unwrap();
        let mut metadata = HashMap::new();
        metadata.insert("doc_type".to_string(), json!("document"));
        assert!(matches_filter(&metadata, &filter));

        metadata.insert("doc_type".to_string(), json!("other"));
        assert!(!matches_filter(&metadata, &filter));
    }

    #[test]
    fn plain_object_equality_still_deserializes_as_eq() {
        let filter: MetadataFilter = serde_json::from_value(json!({"source_metadata": {"canonical_id": "a.py"}})).unwrap();
        assert!(matches!(filter.get("source_metadata"), Some(MetadataPredicate::Eq(_))));
    }
}
