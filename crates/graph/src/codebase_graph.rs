//! Query-time `CodebaseGraph`: adjacency list keyed by canonical_id, with
//! BFS traversal over forward/reverse edge sets per relation type.

use hybridrag_core::artifact::{RelationType, Relationship};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct Node {
    pub canonical_id: String,
    pub relative_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Default)]
struct EdgeSets {
    by_type: HashMap<RelationType, HashSet<String>>,
}

impl EdgeSets {
    fn insert(&mut self, relation_type: RelationType, target: String) {
        self.by_type.entry(relation_type).or_default().insert(target);
    }
}

#[derive(Debug, Default)]
pub struct CodebaseGraph {
    nodes: HashMap<String, Node>,
    out_edges: HashMap<String, EdgeSets>,
    in_edges: HashMap<String, EdgeSets>,
}

impl CodebaseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, canonical_id: impl Into<String>, relative_path: impl Into<String>) {
        let canonical_id = canonical_id.into();
        self.nodes
            .entry(canonical_id.clone())
            .or_insert_with(|| Node { canonical_id: canonical_id.clone(), relative_path: relative_path.into() });
    }

    /// Both endpoints must already exist as nodes.
    pub fn add_edge(&mut self, from: &str, to: &str, relation_type: RelationType) -> Result<(), String> {
        if !self.nodes.contains_key(from) {
            return Err(format!("unknown node: {from}"));
        }
        if !self.nodes.contains_key(to) {
            return Err(format!("unknown node: {to}"));
        }
        self.out_edges.entry(from.to_string()).or_default().insert(relation_type, to.to_string());
        self.in_edges.entry(to.to_string()).or_default().insert(relation_type, from.to_string());
        Ok(())
    }

    pub fn get_node(&self, canonical_id: &str) -> Option<&Node> {
        self.nodes.get(canonical_id)
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.nodes.contains_key(canonical_id)
    }

    /// Build from a flat relationship list plus the set of canonical_ids
    /// that should exist as nodes (every artifact, not just edge
    /// endpoints, so isolated nodes are still queryable).
    pub fn from_relationships<'a>(node_ids: impl Iterator<Item = (&'a str, &'a str)>, relationships: &[Relationship]) -> Self {
        let mut graph = Self::new();
        for (canonical_id, relative_path) in node_ids {
            graph.add_node(canonical_id, relative_path);
        }
        for rel in relationships {
            let _ = graph.add_edge(&rel.from_canonical_id, &rel.to_canonical_id, rel.relation_type);
        }
        graph
    }

    /// BFS from `start_cid`. Emits nodes in discovery order, excluding the
    /// start node, never revisiting. `allowed` restricts which relation
    /// types are followed (`None` = all).
    pub fn bfs_traversal(
        &self,
        start_cid: &str,
        allowed: Option<&HashSet<RelationType>>,
        direction: Direction,
        max_depth: u32,
    ) -> Vec<Node> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start_cid.to_string());
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((start_cid.to_string(), 0));
        let mut results = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth > 0 {
                if let Some(node) = self.nodes.get(&current) {
                    results.push(node.clone());
                }
            }

            if depth >= max_depth {
                continue;
            }

            let edge_map = match direction {
                Direction::Forward => self.out_edges.get(&current),
                Direction::Reverse => self.in_edges.get(&current),
            };
            let Some(edge_map) = edge_map else { continue };

            let mut neighbors: Vec<&String> = Vec::new();
            match allowed {
                Some(types) => {
                    for rel_type in types {
                        if let Some(targets) = edge_map.by_type.get(rel_type) {
                            neighbors.extend(targets.iter());
                        }
                    }
                }
                None => {
                    for targets in edge_map.by_type.values() {
                        neighbors.extend(targets.iter());
                    }
                }
            }
            neighbors.sort();
            neighbors.dedup();

            for neighbor in neighbors {
                if !visited.contains(neighbor) {
                    visited.insert(neighbor.clone());
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> CodebaseGraph {
        let mut g = CodebaseGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.add_node(id, "f.py");
        }
        g.add_edge("a", "b", RelationType::Defines).unwrap();
        g.add_edge("b", "c", RelationType::Call).unwrap();
        g.add_edge("a", "d", RelationType::Call).unwrap();
        g
    }

    #[test]
    fn bfs_excludes_start_and_respects_depth() {
        let g = sample_graph();
        let reached = g.bfs_traversal("a", None, Direction::Forward, 1);
        let ids: HashSet<_> = reached.iter().map(|n| n.canonical_id.clone()).collect();
        assert_eq!(ids, ["b", "d"].into_iter().map(String::from).collect());
    }

    #[test]
    fn bfs_respects_relation_type_filter() {
        let g = sample_graph();
        let allowed: HashSet<RelationType> = [RelationType::Call].into_iter().collect();
        let reached = g.bfs_traversal("a", Some(&allowed), Direction::Forward, 2);
        let ids: HashSet<_> = reached.iter().map(|n| n.canonical_id.clone()).collect();
        assert_eq!(ids, ["d"].into_iter().map(String::from).collect());
    }

    #[test]
    fn edge_with_unknown_endpoint_errors() {
        let mut g = CodebaseGraph::new();
        g.add_node("a", "f.py");
        assert!(g.add_edge("a", "missing", RelationType::Call).is_err());
    }
}
