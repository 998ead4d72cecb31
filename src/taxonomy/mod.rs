//! The classified concept hierarchy.
//!
//! Mutually subsuming named concepts share one [`Node`]; nodes are linked
//! to their direct parents and children. Every node descends from the top
//! node, and the bottom node (holding every unsatisfiable concept) sits
//! under every leaf.

pub mod builder;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, TaxonomyError};

pub use builder::TaxonomyBuilder;

/// Identifier of a taxonomy node. Stable for nodes an incremental run does
/// not touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A set of equivalent named concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    concepts: BTreeSet<Arc<str>>,
    parents: BTreeSet<NodeId>,
    children: BTreeSet<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The equivalent concepts of this node, in identifier order.
    pub fn concepts(&self) -> impl Iterator<Item = &str> + '_ {
        self.concepts.iter().map(|c| &**c)
    }

    /// The smallest identifier in the node, used as its representative.
    pub fn canonical(&self) -> &str {
        self.concepts.first().map(|c| &**c).unwrap_or_default()
    }

    pub fn contains(&self, concept: &str) -> bool {
        self.concepts.contains(concept)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Direct parents.
    pub fn parents(&self) -> &BTreeSet<NodeId> {
        &self.parents
    }

    /// Direct children.
    pub fn children(&self) -> &BTreeSet<NodeId> {
        &self.children
    }
}

/// The DAG of nodes plus the concept → node map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    nodes: BTreeMap<NodeId, Node>,
    by_concept: HashMap<Arc<str>, NodeId>,
    top: NodeId,
    bottom: NodeId,
    next_id: u32,
}

impl Taxonomy {
    /// The node a concept belongs to.
    pub fn node(&self, concept: &str) -> Result<&Node, QueryError> {
        self.by_concept
            .get(concept)
            .and_then(|id| self.nodes.get(id))
            .ok_or_else(|| QueryError::ConceptNotFound {
                concept: concept.to_string(),
            })
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn top(&self) -> &Node {
        &self.nodes[&self.top]
    }

    pub fn bottom(&self) -> &Node {
        &self.nodes[&self.bottom]
    }

    /// All nodes in id order. The iterator can be restarted by calling
    /// this again.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Concept identifier → node id for every classified concept.
    pub fn node_map(&self) -> &HashMap<Arc<str>, NodeId> {
        &self.by_concept
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn concept_count(&self) -> usize {
        self.by_concept.len()
    }

    pub fn parents<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.parents.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All nodes above `id`, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.walk(id, |node| &node.parents)
    }

    /// All nodes below `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.walk(id, |node| &node.children)
    }

    fn walk(&self, start: NodeId, next: impl Fn(&Node) -> &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for &neighbour in next(node) {
                if seen.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }
        seen
    }

    /// `sub ⊑ sup` according to the taxonomy.
    pub fn is_subsumed_by(&self, sub: &str, sup: &str) -> Result<bool, QueryError> {
        let sub = self.node(sub)?;
        let sup = self.node(sup)?;
        Ok(sub.id == sup.id || sub.id == self.bottom || self.ancestors(sub.id).contains(&sup.id))
    }

    /// Snapshot as a petgraph graph with child → parent edges.
    pub fn to_graph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.nodes.len());
        let indices: HashMap<NodeId, NodeIndex> = self
            .nodes
            .keys()
            .map(|&id| (id, graph.add_node(id)))
            .collect();
        for node in self.nodes.values() {
            for parent in &node.parents {
                graph.add_edge(indices[&node.id], indices[parent], ());
            }
        }
        graph
    }

    /// Check the structural invariants: acyclic, every node below top,
    /// parent and child edges mirror each other, the concept map is exact.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        let invalid = |message: String| Err(TaxonomyError::Invalid { message });
        if !self.nodes.contains_key(&self.top) || !self.nodes.contains_key(&self.bottom) {
            return invalid("top or bottom node is missing".into());
        }
        if is_cyclic_directed(&self.to_graph()) {
            return invalid("taxonomy contains a cycle".into());
        }
        let below_top = self.descendants(self.top);
        for node in self.nodes.values() {
            if node.id != self.top && !below_top.contains(&node.id) {
                return invalid(format!("node {} is not below top", node.id));
            }
            for parent in &node.parents {
                let mirrored = self
                    .nodes
                    .get(parent)
                    .is_some_and(|p| p.children.contains(&node.id));
                if !mirrored {
                    return invalid(format!("edge {} -> {parent} has no child entry", node.id));
                }
            }
            for concept in &node.concepts {
                if self.by_concept.get(concept) != Some(&node.id) {
                    return invalid(format!("concept {concept} is not mapped to {}", node.id));
                }
            }
        }
        let mapped: usize = self.nodes.values().map(Node::len).sum();
        if mapped != self.by_concept.len() {
            return invalid("concept map has entries without a node".into());
        }
        Ok(())
    }

    /// Whether both taxonomies have the same partition into nodes and the
    /// same edges, ignoring node ids.
    pub fn same_structure(&self, other: &Taxonomy) -> bool {
        self.shape() == other.shape()
    }

    fn shape(&self) -> BTreeSet<(String, BTreeSet<String>, BTreeSet<String>)> {
        self.nodes
            .values()
            .map(|node| {
                let members = node.concepts().collect::<Vec<_>>().join(",");
                let parents = self
                    .parents(node)
                    .map(|p| p.canonical().to_string())
                    .collect();
                let children = self
                    .children(node)
                    .map(|c| c.canonical().to_string())
                    .collect();
                (members, parents, children)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// top ─ a ─ b ─ bottom
    fn chain() -> Taxonomy {
        let node = |id: u32, concepts: &[&str], parents: &[u32], children: &[u32]| Node {
            id: NodeId(id),
            concepts: concepts.iter().map(|c| Arc::from(*c)).collect(),
            parents: parents.iter().map(|&p| NodeId(p)).collect(),
            children: children.iter().map(|&c| NodeId(c)).collect(),
        };
        let nodes = [
            node(0, &["_TOP_"], &[], &[1]),
            node(1, &["A", "A2"], &[0], &[2]),
            node(2, &["B"], &[1], &[3]),
            node(3, &["_BOTTOM_"], &[2], &[]),
        ];
        let by_concept = nodes
            .iter()
            .flat_map(|n| n.concepts.iter().map(move |c| (c.clone(), n.id)))
            .collect();
        Taxonomy {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            by_concept,
            top: NodeId(0),
            bottom: NodeId(3),
            next_id: 4,
        }
    }

    #[test]
    fn lookup_by_concept() {
        let taxonomy = chain();
        assert_eq!(taxonomy.node("A2").unwrap().canonical(), "A");
        assert!(matches!(
            taxonomy.node("Z"),
            Err(QueryError::ConceptNotFound { .. })
        ));
    }

    #[test]
    fn ancestry_queries() {
        let taxonomy = chain();
        assert!(taxonomy.is_subsumed_by("B", "A").unwrap());
        assert!(taxonomy.is_subsumed_by("A", "A2").unwrap());
        assert!(!taxonomy.is_subsumed_by("A", "B").unwrap());
        assert_eq!(taxonomy.ancestors(NodeId(2)).len(), 2);
        assert_eq!(taxonomy.descendants(NodeId(0)).len(), 3);
    }

    #[test]
    fn valid_chain_passes_validation() {
        let taxonomy = chain();
        taxonomy.validate().unwrap();
        assert_eq!(taxonomy.to_graph().edge_count(), 3);
        assert!(taxonomy.same_structure(&taxonomy.clone()));
    }

    #[test]
    fn cycles_are_detected() {
        let mut taxonomy = chain();
        taxonomy.nodes.get_mut(&NodeId(1)).unwrap().parents.insert(NodeId(2));
        taxonomy.nodes.get_mut(&NodeId(2)).unwrap().children.insert(NodeId(1));
        assert!(matches!(
            taxonomy.validate(),
            Err(TaxonomyError::Invalid { .. })
        ));
    }
}
