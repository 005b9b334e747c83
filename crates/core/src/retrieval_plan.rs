//! The immutable `RetrievalPlan` algebra and the document-only expansion
//! operator `expand_retrieval_plan`.

use crate::artifact::RelationType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionMetadata {
    pub source_document_id: String,
    pub relation_type: String,
}

/// Constraints governing both a plan's scope and a single expansion call:
/// max traversal depth, an optional relation-type allowlist, and whether
/// reverse edges may be followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConstraints {
    pub max_depth: u32,
    pub allowed_relation_types: Option<HashSet<RelationType>>,
    pub allow_bidirectional: bool,
}

impl Default for PlanConstraints {
    fn default() -> Self {
        Self { max_depth: 1, allowed_relation_types: None, allow_bidirectional: false }
    }
}

/// Immutable plan describing which documents are in scope for a query and
/// why. Expansion always returns a new plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    pub seed_document_ids: HashSet<String>,
    pub expanded_document_ids: HashSet<String>,
    pub expansion_metadata: HashMap<String, ExpansionMetadata>,
    pub constraints: PlanConstraints,
}

impl RetrievalPlan {
    pub fn new(seed_document_ids: HashSet<String>) -> Self {
        Self {
            seed_document_ids,
            expanded_document_ids: HashSet::new(),
            expansion_metadata: HashMap::new(),
            constraints: PlanConstraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: PlanConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sorted lists for deterministic serialization.
    pub fn to_sorted_summary(&self) -> RetrievalPlanSummary {
        let mut seed: Vec<String> = self.seed_document_ids.iter().cloned().collect();
        seed.sort();
        let mut expanded: Vec<String> = self.expanded_document_ids.iter().cloned().collect();
        expanded.sort();
        RetrievalPlanSummary { seed_document_ids: seed, expanded_document_ids: expanded }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalPlanSummary {
    pub seed_document_ids: Vec<String>,
    pub expanded_document_ids: Vec<String>,
}

/// A single outgoing relationship as reported by the injected callback:
/// `(target_document_id, relation_type)`.
#[derive(Debug, Clone)]
pub struct OutgoingRelationship {
    pub target_document_id: String,
    pub relation_type: String,
}

/// Extend `plan` with additional documents via bounded DFS over an
/// injected outgoing-relationships callback. Does not modify `plan`;
/// returns a new plan. Traversal order is deterministic: relationships at
/// each hop are sorted by `target_document_id` before being walked.
pub fn expand_retrieval_plan<F>(plan: &RetrievalPlan, mut list_outgoing_relationships: F, constraints: &PlanConstraints) -> RetrievalPlan
where
    F: FnMut(&str) -> Vec<OutgoingRelationship>,
{
    let mut visited: HashSet<String> =
        plan.seed_document_ids.iter().cloned().chain(plan.expanded_document_ids.iter().cloned()).collect();
    let mut expanded_ids: HashSet<String> = HashSet::new();
    let mut new_expansion_metadata = plan.expansion_metadata.clone();

    fn traverse<F>(
        doc_id: &str,
        depth: u32,
        constraints: &PlanConstraints,
        list_outgoing_relationships: &mut F,
        visited: &mut HashSet<String>,
        expanded_ids: &mut HashSet<String>,
        new_expansion_metadata: &mut HashMap<String, ExpansionMetadata>,
    ) where
        F: FnMut(&str) -> Vec<OutgoingRelationship>,
    {
        if depth > constraints.max_depth {
            return;
        }

        let mut outgoing = list_outgoing_relationships(doc_id);
        outgoing.sort_by(|a, b| a.target_document_id.cmp(&b.target_document_id));

        for rel in outgoing {
            if let Some(allowed) = &constraints.allowed_relation_types {
                let matches = allowed.iter().any(|r| r.as_str() == rel.relation_type);
                if !matches {
                    continue;
                }
            }

            if !visited.contains(&rel.target_document_id) {
                visited.insert(rel.target_document_id.clone());
                expanded_ids.insert(rel.target_document_id.clone());
                new_expansion_metadata.insert(
                    rel.target_document_id.clone(),
                    ExpansionMetadata {
                        source_document_id: doc_id.to_string(),
                        relation_type: rel.relation_type.clone(),
                    },
                );
                traverse(
                    &rel.target_document_id,
                    depth + 1,
                    constraints,
                    list_outgoing_relationships,
                    visited,
                    expanded_ids,
                    new_expansion_metadata,
                );
            }
        }
    }

    let mut seeds: Vec<String> = plan.seed_document_ids.iter().cloned().collect();
    seeds.sort();
    for seed_id in &seeds {
        traverse(
            seed_id,
            1,
            constraints,
            &mut list_outgoing_relationships,
            &mut visited,
            &mut expanded_ids,
            &mut new_expansion_metadata,
        );
    }

    RetrievalPlan {
        seed_document_ids: plan.seed_document_ids.clone(),
        expanded_document_ids: plan.expanded_document_ids.union(&expanded_ids).cloned().collect(),
        expansion_metadata: new_expansion_metadata,
        constraints: plan.constraints.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    #[test]
    fn expansion_respects_type_and_depth_bound() {
        // Seeds {A}, outgoing A->B (DEFINES), B->C (CALL);
        // constraints {max_depth:1, allowed:{DEFINES}} => expanded {B}.
        let mut edges: Map<&str, Vec<(&str, &str)>> = Map::new();
        edges.insert("A", vec![("B", "DEFINES")]);
        edges.insert("B", vec![("C", "CALL")]);

        let plan = RetrievalPlan::new(["A".to_string()].into_iter().collect());
        let constraints = PlanConstraints {
            max_depth: 1,
            allowed_relation_types: Some([RelationType::Defines].into_iter().collect()),
            allow_bidirectional: false,
        };

        let new_plan = expand_retrieval_plan(
            &plan,
            |doc_id| {
                edges
                    .get(doc_id)
                    .map(|v| {
                        v.iter()
                            .map(|(target, rel)| OutgoingRelationship {
                                target_document_id: target.to_string(),
                                relation_type: rel.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            },
            &constraints,
        );

        assert_eq!(new_plan.expanded_document_ids, ["B".to_string()].into_iter().collect());
        assert_eq!(new_plan.seed_document_ids, plan.seed_document_ids);
        assert_eq!(new_plan.expansion_metadata["B"].source_document_id, "A");
    }

    #[test]
    fn expansion_never_reintroduces_seeds() {
        let mut edges: Map<&str, Vec<(&str, &str)>> = Map::new();
        edges.insert("A", vec![("A", "DEFINES"), ("B", "DEFINES")]);

        let plan = RetrievalPlan::new(["A".to_string()].into_iter().collect());
        let constraints = PlanConstraints::default();
        let new_plan = expand_retrieval_plan(
            &plan,
            |doc_id| {
                edges
                    .get(doc_id)
                    .map(|v| {
                        v.iter()
                            .map(|(target, rel)| OutgoingRelationship {
                                target_document_id: target.to_string(),
                                relation_type: rel.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            },
            &constraints,
        );

        assert!(new_plan.expanded_document_ids.is_disjoint(&new_plan.seed_document_ids));
        assert_eq!(new_plan.expanded_document_ids, ["B".to_string()].into_iter().collect());
    }
}
