//! In-memory `RepoGraph`: the set of artifacts (keyed by canonical_id) and
//! relationships produced by one ingestion run, before persistence.

use hybridrag_core::artifact::{Artifact, Relationship};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct RepoGraph {
    pub entities: HashMap<String, Artifact>,
    pub files: HashMap<String, Vec<String>>,
    pub relationships: Vec<Relationship>,
}

impl RepoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, artifact: Artifact) {
        self.files.entry(artifact.relative_path.clone()).or_default().push(artifact.id.clone());
        self.entities.insert(artifact.id.clone(), artifact);
    }

    pub fn get_entity(&self, canonical_id: &str) -> Option<&Artifact> {
        self.entities.get(canonical_id)
    }

    pub fn all_entities(&self) -> impl Iterator<Item = &Artifact> {
        self.entities.values()
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        if relationship.from_canonical_id == relationship.to_canonical_id {
            return;
        }
        let exists = self.relationships.iter().any(|r| {
            r.from_canonical_id == relationship.from_canonical_id
                && r.to_canonical_id == relationship.to_canonical_id
                && r.relation_type == relationship.relation_type
        });
        if !exists {
            self.relationships.push(relationship);
        }
    }
}
