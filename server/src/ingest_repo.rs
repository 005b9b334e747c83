//! Repo-level ingestion orchestration behind `POST /v1/ingest-repo`:
//! clone/local path -> `RepoGraphBuilder::build()` -> repo-level node
//! replacement -> per-artifact chunk+embed -> relationship commit ->
//! `CodebaseGraph` cache invalidation.

use hybridrag_core::artifact::{ArtifactKind, RelationType as CoreRelationType, Relationship};
use hybridrag_core::chunk::DocumentRelationship;
use hybridrag_core::error::Result;
use hybridrag_core::identity::build_repo_id;
use hybridrag_graph::{CodebaseGraph, RepoGraphBuilder, RepoGraphCache};
use hybridrag_ingest::IngestionPipeline;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::pg_store::PgGraphStore;

fn doc_type_for(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Module => "module",
        ArtifactKind::Class => "class",
        ArtifactKind::Function => "function",
        ArtifactKind::Method => "method",
        ArtifactKind::MarkdownModule => "markdown_module",
        ArtifactKind::MarkdownSection => "markdown_section",
        ArtifactKind::Import | ArtifactKind::Call => "transient",
    }
}

/// Builds the in-memory `RepoGraph` for `root`, replaces `repo_id`'s
/// persisted nodes/relationships with it, chunks+embeds every
/// documentable artifact's text, then invalidates the query-time
/// `CodebaseGraph` cache so the next retrieval rebuilds from the new rows.
pub async fn ingest_repo_path(
    root: &Path,
    repo_id: Uuid,
    source: &str,
    ingestion_id: Uuid,
    graph_store: &PgGraphStore,
    pipeline: &IngestionPipeline,
    graph_cache: &RepoGraphCache,
) -> Result<usize> {
    let repo_graph = RepoGraphBuilder::new(root).build();

    graph_store.delete_repo_nodes(repo_id).await?;

    let mut canonical_to_doc_id: HashMap<String, Uuid> = HashMap::new();
    let mut node_count = 0usize;

    let mut artifacts: Vec<_> = repo_graph.all_entities().collect();
    artifacts.sort_by(|a, b| a.id.cmp(&b.id));

    for artifact in artifacts {
        if matches!(artifact.kind, ArtifactKind::Import | ArtifactKind::Call) {
            continue;
        }
        let text = artifact.text.clone().unwrap_or_default();
        let node = pipeline
            .run(repo_id, &artifact.id, &artifact.relative_path, &artifact.name, source, doc_type_for(artifact.kind), &text, ingestion_id, None)
            .await?;
        canonical_to_doc_id.insert(artifact.id.clone(), node.document_id);
        node_count += 1;
    }

    for relationship in &repo_graph.relationships {
        let (Some(&from_id), Some(&to_id)) =
            (canonical_to_doc_id.get(&relationship.from_canonical_id), canonical_to_doc_id.get(&relationship.to_canonical_id))
        else {
            continue;
        };
        graph_store
            .upsert_document_relationship(DocumentRelationship {
                id: Uuid::new_v4(),
                from_document_id: from_id,
                to_document_id: to_id,
                relation_type: relationship.relation_type.as_str().to_string(),
                relationship_metadata: serde_json::to_value(&relationship.metadata).unwrap_or(serde_json::json!({})),
                created_at: chrono::Utc::now(),
            })
            .await?;
    }

    graph_cache.invalidate(repo_id);

    info!(%repo_id, nodes = node_count, "ingested repository");
    Ok(node_count)
}

/// Reconstruct the query-time `CodebaseGraph` for `repo_id` from the rows
/// `ingest_repo_path` committed — the `RepoGraphCache` rebuild closure.
pub async fn load_codebase_graph(graph_store: &PgGraphStore, repo_id: Uuid) -> Result<CodebaseGraph> {
    let (nodes, relationships) = graph_store.graph_export(repo_id).await?;
    let relationships: Vec<Relationship> = relationships
        .into_iter()
        .filter_map(|(from, to, rel_type)| rel_type.parse::<CoreRelationType>().ok().map(|rel_type| Relationship { from_canonical_id: from, to_canonical_id: to, relation_type: rel_type, metadata: HashMap::new() }))
        .collect();
    let node_refs: Vec<(&str, &str)> = nodes.iter().map(|(cid, path)| (cid.as_str(), path.as_str())).collect();
    Ok(CodebaseGraph::from_relationships(node_refs.into_iter(), &relationships))
}

pub fn repo_id_for_source(source: &str) -> Uuid {
    build_repo_id(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_skips_transient_artifact_kinds() {
        assert_eq!(doc_type_for(ArtifactKind::Module), "module");
        assert_eq!(doc_type_for(ArtifactKind::MarkdownSection), "markdown_section");
        assert_eq!(doc_type_for(ArtifactKind::Call), "transient");
        assert_eq!(doc_type_for(ArtifactKind::Import), "transient");
    }

    #[test]
    fn repo_id_for_source_is_stable_across_git_suffix_variants() {
        let a = repo_id_for_source("https://example.com/org/repo");
        let b = repo_id_for_source("https://example.com/org/repo.git");
        assert_eq!(a, b);
    }
}
