//! Builds a [`Taxonomy`] from a saturation, either from scratch or by
//! splicing a rebuilt region into the previous taxonomy.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;

use crate::index::{ConceptId, Interner};
use crate::saturation::Saturation;

use super::{Node, NodeId, Taxonomy};

/// Reads named-concept subsumers out of a saturation.
pub struct TaxonomyBuilder<'a> {
    interner: &'a Interner,
    saturation: &'a Saturation,
}

/// A rebuilt taxonomy and the nodes whose structure changed.
pub struct Rebuild {
    pub taxonomy: Taxonomy,
    pub affected: BTreeSet<NodeId>,
    pub region: usize,
}

impl<'a> TaxonomyBuilder<'a> {
    pub fn new(interner: &'a Interner, saturation: &'a Saturation) -> Self {
        Self {
            interner,
            saturation,
        }
    }

    /// Build the full taxonomy.
    pub fn build(&self) -> Taxonomy {
        let region: BTreeSet<ConceptId> = self.named().map(|(id, _)| id).collect();
        self.splice(None, &region).taxonomy
    }

    /// Rebuild the part of `previous` that `changed` concepts can reach.
    ///
    /// `changed` holds the contexts the saturation recomputed. Nodes outside
    /// the rebuilt region keep their ids.
    pub fn rebuild(&self, previous: &Taxonomy, changed: &HashSet<ConceptId>) -> Rebuild {
        let region = self.region(previous, changed);
        tracing::debug!(region = region.len(), "taxonomy region selected");
        self.splice(Some(previous), &region)
    }

    fn named(&self) -> impl Iterator<Item = (ConceptId, &'a Arc<str>)> + 'a {
        let saturation = self.saturation;
        self.interner
            .named_concepts()
            .filter(move |(id, _)| id.index() < saturation.len())
    }

    fn subsumers(&self, id: ConceptId) -> impl Iterator<Item = ConceptId> + '_ {
        self.saturation
            .context(id)
            .into_iter()
            .flat_map(|context| context.subsumers().iter().copied())
    }

    fn is_unsatisfiable(&self, id: ConceptId) -> bool {
        !self.saturation.is_satisfiable(id)
    }

    /// Named concepts whose node placement may have changed: the changed
    /// and new concepts, their former node-mates, and everything below
    /// them, to a fixpoint.
    fn region(&self, previous: &Taxonomy, changed: &HashSet<ConceptId>) -> BTreeSet<ConceptId> {
        let mut region: HashSet<ConceptId> = self
            .named()
            .filter(|(id, name)| changed.contains(id) || !previous.by_concept.contains_key(*name))
            .map(|(id, _)| id)
            .collect();
        let candidates: Vec<ConceptId> = self
            .named()
            .filter(|&(id, _)| !self.is_unsatisfiable(id))
            .map(|(id, _)| id)
            .collect();

        let mut frontier: Vec<ConceptId> = region.iter().copied().collect();
        while !frontier.is_empty() {
            let mut grown = Vec::new();
            for id in frontier.drain(..) {
                let Some(name) = self.interner.concept_name(id) else {
                    continue;
                };
                let Some(&node_id) = previous.by_concept.get(name) else {
                    continue;
                };
                if node_id == previous.bottom {
                    continue;
                }
                for mate in &previous.nodes[&node_id].concepts {
                    if let Some(mate) = self.interner.concept_id(mate) {
                        if region.insert(mate) {
                            grown.push(mate);
                        }
                    }
                }
            }
            let below: Vec<ConceptId> = candidates
                .par_iter()
                .copied()
                .filter(|id| !region.contains(id))
                .filter(|&id| self.subsumers(id).any(|s| region.contains(&s)))
                .collect();
            for id in below {
                if region.insert(id) {
                    grown.push(id);
                }
            }
            frontier = grown;
        }
        region.into_iter().collect()
    }

    fn splice(&self, base: Option<&Taxonomy>, region: &BTreeSet<ConceptId>) -> Rebuild {
        let name_of = |id: ConceptId| self.interner.concept_name(id).cloned();

        // Unsatisfiable concepts all collapse into bottom, wherever they sit.
        let unsatisfiable: BTreeSet<Arc<str>> = self
            .named()
            .filter(|&(id, _)| self.is_unsatisfiable(id))
            .map(|(_, name)| name.clone())
            .collect();

        let mut next_id = base.map(|t| t.next_id).unwrap_or(0);
        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        let mut by_concept: HashMap<Arc<str>, NodeId> = HashMap::new();
        let region_names: HashSet<Arc<str>> = region.iter().filter_map(|&id| name_of(id)).collect();

        if let Some(base) = base {
            for (id, node) in &base.nodes {
                if *id == base.bottom || node.concepts.iter().any(|c| region_names.contains(c)) {
                    continue;
                }
                let mut kept = node.clone();
                kept.children.clear();
                for concept in &kept.concepts {
                    by_concept.insert(concept.clone(), *id);
                }
                nodes.insert(*id, kept);
            }
        }

        // Equivalence classes among the satisfiable region concepts.
        let members: Vec<ConceptId> = region
            .iter()
            .copied()
            .filter(|&id| !self.is_unsatisfiable(id))
            .collect();
        let position: HashMap<ConceptId, usize> =
            members.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut classes = UnionFind::<usize>::new(members.len());
        for (i, &id) in members.iter().enumerate() {
            for sup in self.subsumers(id) {
                if let Some(&j) = position.get(&sup) {
                    if j != i && self.saturation.subsumes(sup, id) {
                        classes.union(i, j);
                    }
                }
            }
        }
        let mut groups: BTreeMap<usize, Vec<ConceptId>> = BTreeMap::new();
        for (i, &id) in members.iter().enumerate() {
            groups.entry(classes.find(i)).or_default().push(id);
        }
        let mut groups: Vec<BTreeSet<Arc<str>>> = groups
            .into_values()
            .map(|ids| ids.into_iter().filter_map(name_of).collect())
            .collect();
        groups.sort();

        let mut created = BTreeSet::new();
        for concepts in groups {
            let id = NodeId(next_id);
            next_id += 1;
            for concept in &concepts {
                by_concept.insert(concept.clone(), id);
            }
            nodes.insert(
                id,
                Node {
                    id,
                    concepts,
                    parents: BTreeSet::new(),
                    children: BTreeSet::new(),
                },
            );
            created.insert(id);
        }

        // Representative concept of every non-bottom node.
        let representative: HashMap<NodeId, ConceptId> = nodes
            .values()
            .filter_map(|node| {
                let rep = self.interner.concept_id(node.canonical())?;
                Some((node.id, rep))
            })
            .collect();
        let node_of = |id: ConceptId| -> Option<NodeId> {
            let name = self.interner.concept_name(id)?;
            by_concept.get(name).copied()
        };

        // Direct parents of the new nodes: candidate nodes above, minus any
        // candidate that sits above another candidate.
        let parents: Vec<(NodeId, BTreeSet<NodeId>)> = created
            .par_iter()
            .map(|&node| {
                let rep = representative[&node];
                let candidates: BTreeSet<NodeId> = self
                    .subsumers(rep)
                    .filter(|&s| !self.is_unsatisfiable(s))
                    .filter_map(|s| node_of(s))
                    .filter(|&n| n != node)
                    .collect();
                let direct = candidates
                    .iter()
                    .copied()
                    .filter(|&c| {
                        !candidates.iter().any(|&d| {
                            d != c && self.saturation.subsumes(representative[&d], representative[&c])
                        })
                    })
                    .collect();
                (node, direct)
            })
            .collect();
        for (node, direct) in parents {
            if let Some(entry) = nodes.get_mut(&node) {
                entry.parents = direct;
            }
        }

        // Children mirror parents.
        let children: DashMap<NodeId, BTreeSet<NodeId>> = DashMap::new();
        nodes.par_iter().for_each(|(&id, node)| {
            for &parent in &node.parents {
                children.entry(parent).or_default().insert(id);
            }
        });
        for (parent, kids) in children {
            if let Some(entry) = nodes.get_mut(&parent) {
                entry.children = kids;
            }
        }

        // Bottom keeps its id across rebuilds and sits under every leaf.
        let bottom = match base {
            Some(base) => base.bottom,
            None => {
                let id = NodeId(next_id);
                next_id += 1;
                id
            }
        };
        let leaves: BTreeSet<NodeId> = nodes
            .values()
            .filter(|node| node.children.is_empty())
            .map(|node| node.id)
            .collect();
        for leaf in &leaves {
            if let Some(entry) = nodes.get_mut(leaf) {
                entry.children.insert(bottom);
            }
        }
        for concept in &unsatisfiable {
            by_concept.insert(concept.clone(), bottom);
        }
        nodes.insert(
            bottom,
            Node {
                id: bottom,
                concepts: unsatisfiable,
                parents: leaves,
                children: BTreeSet::new(),
            },
        );

        let top = by_concept
            .get(crate::model::TOP)
            .copied()
            .unwrap_or(bottom);

        let mut affected = created;
        if let Some(base) = base {
            for (id, node) in &nodes {
                let unchanged = base
                    .nodes
                    .get(id)
                    .is_some_and(|old| old == node);
                if !unchanged {
                    affected.insert(*id);
                }
            }
        }

        Rebuild {
            region: region.len(),
            affected,
            taxonomy: Taxonomy {
                nodes,
                by_concept,
                top,
                bottom,
                next_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::index::AxiomIndex;
    use crate::model::{Axiom, Concept};

    fn classify(axioms: &[Axiom]) -> Taxonomy {
        let mut interner = Interner::new();
        let index = AxiomIndex::build(&mut interner, axioms).unwrap();
        let (saturation, _) = Saturation::compute(&index, 1, &CancellationToken::new()).unwrap();
        let taxonomy = TaxonomyBuilder::new(&interner, &saturation).build();
        taxonomy.validate().unwrap();
        taxonomy
    }

    fn sub(a: &str, b: &str) -> Axiom {
        Axiom::concept_inclusion(Concept::named(a), Concept::named(b))
    }

    #[test]
    fn direct_parents_skip_transitive_edges() {
        let taxonomy = classify(&[sub("A", "B"), sub("B", "C"), sub("A", "C")]);
        let a = taxonomy.node("A").unwrap();
        let parents: Vec<&str> = taxonomy.parents(a).map(|n| n.canonical()).collect();
        assert_eq!(parents, vec!["B"]);
        let c = taxonomy.node("C").unwrap();
        assert_eq!(c.parents(), &BTreeSet::from([taxonomy.top().id()]));
    }

    #[test]
    fn equivalent_concepts_share_a_node() {
        let taxonomy = classify(&[sub("A", "B"), sub("B", "A"), sub("C", "A")]);
        let a = taxonomy.node("A").unwrap();
        assert_eq!(a.concepts().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(taxonomy.node("C").unwrap().parents(), &BTreeSet::from([a.id()]));
    }

    #[test]
    fn unsatisfiable_concepts_join_bottom() {
        let taxonomy = classify(&[
            sub("A", "B"),
            Axiom::concept_inclusion(Concept::named("A"), Concept::bottom()),
        ]);
        let bottom = taxonomy.bottom();
        assert!(bottom.contains("A"));
        assert!(bottom.contains(crate::model::BOTTOM));
        // B is the only leaf above bottom.
        let b = taxonomy.node("B").unwrap();
        assert_eq!(bottom.parents(), &BTreeSet::from([b.id()]));
    }

    #[test]
    fn rebuild_of_nothing_changes_nothing() {
        let axioms = [sub("A", "B"), sub("C", "B")];
        let mut interner = Interner::new();
        let index = AxiomIndex::build(&mut interner, &axioms).unwrap();
        let (saturation, _) = Saturation::compute(&index, 1, &CancellationToken::new()).unwrap();
        let builder = TaxonomyBuilder::new(&interner, &saturation);
        let full = builder.build();
        let rebuilt = builder.rebuild(&full, &HashSet::new());
        assert!(rebuilt.affected.is_empty());
        assert!(rebuilt.taxonomy.same_structure(&full));
        assert_eq!(rebuilt.taxonomy.node("A").unwrap().id(), full.node("A").unwrap().id());
    }
}
