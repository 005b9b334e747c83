//! `RepoGraphBuilder` — turns a repository directory into a `RepoGraph`:
//! walk, extract, assign identity, then derive DEFINES/CALL/DOCUMENTS (and
//! an IMPORT promotion pass).

use crate::extractors::{MarkdownExtractor, PythonExtractor};
use crate::repo_graph::RepoGraph;
use crate::symbol_table::SymbolTable;
use hybridrag_core::artifact::{ArtifactKind, RelationType, Relationship};
use ignore::WalkBuilder;
use std::path::Path;
use tracing::warn;

pub struct RepoGraphBuilder {
    root: std::path::PathBuf,
}

impl RepoGraphBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Walk, extract, and derive all relationship classes. Per-file
    /// failures (unreadable bytes, etc.) are caught and skipped — they do
    /// not fail the build.
    pub fn build(&self) -> RepoGraph {
        let mut graph = RepoGraph::new();

        for relative_path in self.discover_files() {
            match self.extract_file(&relative_path) {
                Ok(artifacts) => {
                    for artifact in artifacts {
                        graph.add_entity(artifact);
                    }
                }
                Err(e) => {
                    warn!(file = %relative_path, error = %e, "skipping file that failed extraction");
                }
            }
        }

        let symbol_table = SymbolTable::build(&graph.entities.values().cloned().collect::<Vec<_>>());

        self.attach_defines(&mut graph);
        self.resolve_calls(&mut graph, &symbol_table);
        self.link_docs_to_code(&mut graph, &symbol_table);
        self.promote_imports(&mut graph);

        graph
    }

    /// Recursively walk the repo, skipping any path with a dot-prefixed
    /// component, keeping only `.py`/`.md` suffixes. Returns paths relative
    /// to `root`, using forward slashes.
    fn discover_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        let walker = WalkBuilder::new(&self.root).hidden(false).git_ignore(false).build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else { continue };
            if relative.components().any(|c| c.as_os_str().to_string_lossy().starts_with('.')) {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("py") | Some("md")) {
                continue;
            }
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
        out.sort();
        out
    }

    fn extract_file(&self, relative_path: &str) -> std::io::Result<Vec<hybridrag_core::artifact::Artifact>> {
        let full_path = self.root.join(relative_path);
        if relative_path.ends_with(".py") {
            let bytes = std::fs::read(&full_path)?;
            Ok(PythonExtractor::new(relative_path, &bytes).extract())
        } else {
            let text = std::fs::read_to_string(&full_path)?;
            Ok(MarkdownExtractor::new(relative_path, &text).extract())
        }
    }

    fn attach_defines(&self, graph: &mut RepoGraph) {
        let mut relationships = Vec::new();
        for artifact in graph.entities.values() {
            if !artifact.kind.is_definition() {
                continue;
            }
            if let Some(parent_id) = &artifact.parent_id {
                if graph.entities.contains_key(parent_id) {
                    relationships.push(Relationship::new(parent_id.clone(), artifact.id.clone(), RelationType::Defines));
                }
            }
        }
        for r in relationships {
            graph.add_relationship(r);
        }
    }

    fn resolve_calls(&self, graph: &mut RepoGraph, symbol_table: &SymbolTable) {
        let mut relationships = Vec::new();
        let call_artifacts: Vec<_> =
            graph.entities.values().filter(|a| a.kind == ArtifactKind::Call).cloned().collect();

        for call in &call_artifacts {
            if call.name == "<unknown>" {
                continue;
            }
            let Some(owner_id) = &call.parent_id else { continue };

            if let Some((target_id, confidence)) = self.resolve_in_scope(graph, owner_id, &call.name, symbol_table) {
                relationships.push(
                    Relationship::new(owner_id.clone(), target_id, RelationType::Call)
                        .with_meta("confidence", confidence),
                );
            }
        }

        for r in relationships {
            graph.add_relationship(r);
        }
    }

    /// Walk the ancestor (`parent_id`) chain of `owner_id` first, looking
    /// for an ancestor whose `name` matches `call_name` (confidence 1.0 —
    /// local lexical scope preferred). Falls back to the global symbol
    /// table (confidence 0.5). Returns `None` if neither resolves.
    fn resolve_in_scope(
        &self,
        graph: &RepoGraph,
        owner_id: &str,
        call_name: &str,
        symbol_table: &SymbolTable,
    ) -> Option<(String, f64)> {
        let mut current = Some(owner_id.to_string());
        while let Some(id) = current {
            let Some(entity) = graph.get_entity(&id) else { break };
            if entity.name == call_name {
                return Some((entity.id.clone(), 1.0));
            }
            current = entity.parent_id.clone();
        }

        symbol_table.lookup(call_name).map(|id| (id.to_string(), 0.5))
    }

    fn link_docs_to_code(&self, graph: &mut RepoGraph, symbol_table: &SymbolTable) {
        let mut relationships = Vec::new();
        let sections: Vec<_> =
            graph.entities.values().filter(|a| a.kind == ArtifactKind::MarkdownSection).cloned().collect();

        for section in &sections {
            let lookup_result = symbol_table
                .lookup(&section.name)
                .or_else(|| symbol_table.lookup(section.name.trim().to_lowercase().trim()));

            let Some(target_id) = lookup_result else { continue };
            if target_id == section.id {
                continue;
            }
            let Some(target) = graph.get_entity(target_id) else { continue };
            if !target.kind.is_documentable() {
                continue;
            }

            relationships.push(
                Relationship::new(section.id.clone(), target_id.to_string(), RelationType::Documents)
                    .with_meta("match_strategy", "exact_name")
                    .with_meta("section_name", section.name.clone())
                    .with_meta("confidence", 1.0),
            );
        }

        for r in relationships {
            graph.add_relationship(r);
        }
    }

    /// Promote IMPORT artifacts to MODULE->MODULE relationships when the
    /// imported module resolves to another file in the same repo (best
    /// effort: `pkg.mod` -> `pkg/mod.py` or `pkg/mod/__init__.py`).
    /// Unresolved imports (third-party packages) emit no edge, symmetric
    /// with CALL's miss rule.
    fn promote_imports(&self, graph: &mut RepoGraph) {
        let mut relationships = Vec::new();
        let imports: Vec<_> = graph.entities.values().filter(|a| a.kind == ArtifactKind::Import).cloned().collect();

        for import in &imports {
            let Some(module_value) = import.metadata.get("module").and_then(|v| v.as_str()) else { continue };
            let candidates = [
                format!("{}.py", module_value.replace('.', "/")),
                format!("{}/__init__.py", module_value.replace('.', "/")),
            ];
            let Some(target_path) = candidates.into_iter().find(|c| graph.files.contains_key(c)) else { continue };
            if target_path == import.relative_path {
                continue;
            }
            relationships.push(Relationship::new(import.relative_path.clone(), target_path, RelationType::Import));
        }

        for r in relationships {
            graph.add_relationship(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn local_call_preference_over_free_function() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "m.py",
            "class C:\n    def go(self):\n        return self.go()\n\ndef go():\n    pass\n",
        );

        let graph = RepoGraphBuilder::new(dir.path()).build();
        let call_edge = graph
            .relationships
            .iter()
            .find(|r| r.relation_type == RelationType::Call && r.from_canonical_id == "m.py#C.go")
            .expect("expected a CALL edge from C.go");

        assert_eq!(call_edge.to_canonical_id, "m.py#C.go");
        assert_eq!(call_edge.metadata.get("confidence").unwrap(), &serde_json::json!(1.0));
    }

    #[test]
    fn documents_edge_links_section_to_function() {
        let dir = tempdir().unwrap();
        write(dir.path(), "lib.py", "def add(a, b):\n    return a + b\n");
        write(dir.path(), "doc.md", "## add\n\nAdds two numbers.\n");

        let graph = RepoGraphBuilder::new(dir.path()).build();
        let doc_edge = graph
            .relationships
            .iter()
            .find(|r| r.relation_type == RelationType::Documents)
            .expect("expected a DOCUMENTS edge");

        assert_eq!(doc_edge.to_canonical_id, "lib.py#add");
        assert_eq!(doc_edge.metadata.get("match_strategy").unwrap(), "exact_name");
    }

    #[test]
    fn defines_edges_cover_module_and_nested_section() {
        let dir = tempdir().unwrap();
        write(dir.path(), "README.md", "# Install\n\n## Docker\n\nbody\n");

        let graph = RepoGraphBuilder::new(dir.path()).build();
        assert!(graph
            .relationships
            .iter()
            .any(|r| r.relation_type == RelationType::Defines
                && r.from_canonical_id == "README.md"
                && r.to_canonical_id == "README.md#install"));
        assert!(graph
            .relationships
            .iter()
            .any(|r| r.relation_type == RelationType::Defines
                && r.from_canonical_id == "README.md#install"
                && r.to_canonical_id == "README.md#install.docker"));
    }

    #[test]
    fn import_promotion_resolves_local_module() {
        let dir = tempdir().unwrap();
        write(dir.path(), "pkg/util.py", "def helper():\n    pass\n");
        write(dir.path(), "pkg/main.py", "import pkg.util\n");

        let graph = RepoGraphBuilder::new(dir.path()).build();
        assert!(graph
            .relationships
            .iter()
            .any(|r| r.relation_type == RelationType::Import
                && r.from_canonical_id == "pkg/main.py"
                && r.to_canonical_id == "pkg/util.py"));
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), ".venv/lib.py", "def ignored():\n    pass\n");
        write(dir.path(), "real.py", "def kept():\n    pass\n");

        let graph = RepoGraphBuilder::new(dir.path()).build();
        assert!(!graph.entities.contains_key(".venv/lib.py"));
        assert!(graph.entities.contains_key("real.py"));
    }
}
