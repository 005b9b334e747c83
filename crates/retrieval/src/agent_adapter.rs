//! Flattens a per-document chunk map into agent-ready records: document
//! order follows the caller-supplied order (seeds first, then expansions),
//! each document contributes at most `per_document_cap` chunks, and the
//! whole flattening stops once `total_cap` chunks have been emitted.

use hybridrag_vectorstore::SearchResult;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AgentChunk {
    pub document_id: Uuid,
    pub text: String,
    pub chunk_id: String,
}

/// `chunks_by_document` maps document_id -> that document's chunks in
/// storage order. `document_order` is the already-decided traversal order
/// (seeds before expansions); documents absent from `chunks_by_document`
/// contribute nothing.
pub fn prepare_chunks_for_agent(
    document_order: &[Uuid],
    chunks_by_document: &std::collections::HashMap<Uuid, Vec<SearchResult>>,
    per_document_cap: usize,
    total_cap: usize,
) -> Vec<AgentChunk> {
    let mut out = Vec::new();
    if total_cap == 0 || per_document_cap == 0 {
        return out;
    }

    for document_id in document_order {
        let Some(chunks) = chunks_by_document.get(document_id) else { continue };
        for chunk in chunks.iter().take(per_document_cap) {
            out.push(AgentChunk { document_id: *document_id, text: chunk.text.clone(), chunk_id: chunk.chunk_id.clone() });
            if out.len() >= total_cap {
                return out;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(chunk_id: &str, text: &str, document_id: Uuid) -> SearchResult {
        SearchResult { chunk_id: chunk_id.to_string(), text: text.to_string(), document_id: Some(document_id), score: 1.0, metadata: HashMap::new() }
    }

    #[test]
    fn caps_per_document_before_moving_to_next_document() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut map = HashMap::new();
        map.insert(a, vec![result("a1", "x", a), result("a2", "y", a), result("a3", "z", a)]);
        map.insert(b, vec![result("b1", "w", b)]);

        let out = prepare_chunks_for_agent(&[a, b], &map, 2, 10);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].document_id, b);
    }

    #[test]
    fn stops_at_total_cap_mid_document() {
        let a = Uuid::new_v4();
        let mut map = HashMap::new();
        map.insert(a, vec![result("a1", "x", a), result("a2", "y", a)]);

        let out = prepare_chunks_for_agent(&[a], &map, 5, 1);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn missing_document_contributes_nothing() {
        let a = Uuid::new_v4();
        let map = HashMap::new();
        let out = prepare_chunks_for_agent(&[a], &map, 5, 10);
        assert!(out.is_empty());
    }
}
