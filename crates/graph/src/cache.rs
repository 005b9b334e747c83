//! Process-wide `repo_id -> CodebaseGraph` cache: single writer per
//! repo_id on first use, readers never mutate, callers may force-reload.

use crate::codebase_graph::CodebaseGraph;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
pub struct RepoGraphCache {
    graphs: DashMap<Uuid, Arc<CodebaseGraph>>,
}

impl RepoGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repo_id: Uuid) -> Option<Arc<CodebaseGraph>> {
        self.graphs.get(&repo_id).map(|entry| entry.value().clone())
    }

    /// Populate the cache for `repo_id` if absent, calling `build` at most
    /// once per miss. `build`'s cost (a graph query or rebuild) is paid by
    /// whichever caller wins the race; both return the same `Arc`.
    pub fn get_or_insert_with(&self, repo_id: Uuid, build: impl FnOnce() -> CodebaseGraph) -> Arc<CodebaseGraph> {
        if let Some(graph) = self.get(repo_id) {
            return graph;
        }
        let graph = Arc::new(build());
        self.graphs.entry(repo_id).or_insert_with(|| graph.clone());
        self.graphs.get(&repo_id).unwrap().value().clone()
    }

    /// Force-reload, bypassing whatever is currently cached.
    pub fn invalidate(&self, repo_id: Uuid) {
        self.graphs.remove(&repo_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_insert_with_builds_once_then_reuses() {
        let cache = RepoGraphCache::new();
        let repo_id = Uuid::new_v4();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let build = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            CodebaseGraph::new()
        };

        cache.get_or_insert_with(repo_id, build);
        cache.get_or_insert_with(repo_id, build);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_rebuild_on_next_call() {
        let cache = RepoGraphCache::new();
        let repo_id = Uuid::new_v4();
        cache.get_or_insert_with(repo_id, CodebaseGraph::new);
        cache.invalidate(repo_id);
        assert!(cache.get(repo_id).is_none());
    }
}
