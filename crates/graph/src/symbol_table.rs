//! Flat `name -> canonical_id` symbol table over CLASS/FUNCTION/METHOD
//! artifacts only (MODULE is deliberately excluded). Last write wins on
//! name collision across files — a known simplification, not a bug.

use hybridrag_core::artifact::Artifact;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, canonical_id: &str) {
        self.symbols.insert(name.to_string(), canonical_id.to_string());
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).map(|s| s.as_str())
    }

    pub fn build(artifacts: &[Artifact]) -> Self {
        let mut table = Self::new();
        for artifact in artifacts {
            if artifact.kind.is_symbol() {
                table.add(&artifact.name, &artifact.id);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::artifact::{Artifact, ArtifactKind};

    #[test]
    fn last_write_wins_across_files() {
        let artifacts = vec![
            Artifact::new(ArtifactKind::Function, "a.py#go", "go", "a.py"),
            Artifact::new(ArtifactKind::Function, "b.py#go", "go", "b.py"),
        ];
        let table = SymbolTable::build(&artifacts);
        assert_eq!(table.lookup("go"), Some("b.py#go"));
    }

    #[test]
    fn modules_are_not_indexed() {
        let artifacts = vec![Artifact::new(ArtifactKind::Module, "a.py", "a", "a.py")];
        let table = SymbolTable::build(&artifacts);
        assert_eq!(table.lookup("a"), None);
    }
}
