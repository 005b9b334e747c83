//! Intent-driven traversal strategy selection, first-match-wins over an
//! ordered keyword table: the "calls"/"called by"/"who calls" branch is
//! checked *before* the bare "calls"/"call" branch, so a query containing
//! the word "calls" is always caught by the callers branch first — the
//! literal "calls"/"call" branch is reachable only via the bare word
//! "call" without "calls" appearing anywhere in the query.

use crate::codebase_graph::{CodebaseGraph, Direction, Node};
use hybridrag_core::artifact::RelationType;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub relation_type: RelationType,
    pub direction: Direction,
    pub depth: u32,
}

impl Strategy {
    fn run(&self, graph: &CodebaseGraph, start_cid: &str) -> Vec<Node> {
        let allowed: HashSet<RelationType> = [self.relation_type].into_iter().collect();
        graph.bfs_traversal(start_cid, Some(&allowed), self.direction, self.depth)
    }
}

/// First-match-wins keyword table over the lowercased query.
pub fn select_traversal_strategies(query: &str) -> Vec<Strategy> {
    let q = query.to_lowercase();

    let defines_forward = Strategy { relation_type: RelationType::Defines, direction: Direction::Forward, depth: 1 };
    let call_reverse = Strategy { relation_type: RelationType::Call, direction: Direction::Reverse, depth: 1 };
    let call_forward = Strategy { relation_type: RelationType::Call, direction: Direction::Forward, depth: 1 };
    let import_reverse = Strategy { relation_type: RelationType::Import, direction: Direction::Reverse, depth: 1 };

    if ["method", "methods", "function", "functions", "class", "classes", "in"].iter().any(|kw| q.contains(kw)) {
        vec![defines_forward]
    } else if ["callers", "calls", "called by", "who calls"].iter().any(|kw| q.contains(kw)) {
        vec![call_reverse]
    } else if ["calls", "call"].iter().any(|kw| q.contains(kw)) {
        vec![call_forward]
    } else if q.contains("import") {
        vec![import_reverse]
    } else {
        vec![defines_forward, call_forward]
    }
}

/// Run every strategy from `start_cid`, concatenate their results, and
/// deduplicate by canonical_id (first occurrence kept, mirroring the
/// original's dict-comprehension dedup but with deterministic
/// first-seen-wins order instead of relying on dict iteration order).
pub fn execute_traversals(graph: &CodebaseGraph, start_cid: &str, strategies: &[Strategy]) -> Vec<Node> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for strategy in strategies {
        for node in strategy.run(graph, start_cid) {
            if seen.insert(node.canonical_id.clone()) {
                out.push(node);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_keyword_selects_defines_forward() {
        let strategies = select_traversal_strategies("what methods are in Foo?");
        assert_eq!(strategies, vec![Strategy { relation_type: RelationType::Defines, direction: Direction::Forward, depth: 1 }]);
    }

    #[test]
    fn calls_keyword_is_caught_by_callers_branch_first() {
        // "who calls" and "calls" both present; callers-branch must win.
        let strategies = select_traversal_strategies("who calls this function");
        assert_eq!(strategies, vec![Strategy { relation_type: RelationType::Call, direction: Direction::Reverse, depth: 1 }]);

        // Bare "calls" alone (no "callers"/"called by"/"who calls" substring)
        // is still caught by branch 2 since "calls" is itself in that list.
        let strategies = select_traversal_strategies("what calls foo");
        assert_eq!(strategies, vec![Strategy { relation_type: RelationType::Call, direction: Direction::Reverse, depth: 1 }]);
    }

    #[test]
    fn bare_call_reaches_call_forward_branch() {
        let strategies = select_traversal_strategies("call foo");
        assert_eq!(strategies, vec![Strategy { relation_type: RelationType::Call, direction: Direction::Forward, depth: 1 }]);
    }

    #[test]
    fn import_keyword_selects_import_reverse() {
        let strategies = select_traversal_strategies("who imports this module");
        assert_eq!(strategies, vec![Strategy { relation_type: RelationType::Import, direction: Direction::Reverse, depth: 1 }]);
    }

    #[test]
    fn default_combines_defines_and_calls_forward() {
        let strategies = select_traversal_strategies("tell me about this");
        assert_eq!(
            strategies,
            vec![
                Strategy { relation_type: RelationType::Defines, direction: Direction::Forward, depth: 1 },
                Strategy { relation_type: RelationType::Call, direction: Direction::Forward, depth: 1 },
            ]
        );
    }
}
