//! Incremental re-classification after the stated axioms change.
//!
//! The old and new rule sets are diffed. Every context whose derivations a
//! changed rule could have fired in (judged against the previous
//! saturation) is a seed; the affected set is the seeds closed under
//! predecessor links, since derived facts only ever flow from a context to
//! the contexts linking into it. Affected contexts are recomputed from
//! scratch; everything else is reused.

use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::error::SaturationError;
use crate::index::{AxiomIndex, ConceptId, FeatureId, Interner, NormalRule, RoleId};
use crate::saturation::{Context, Saturation, SaturationStats};
use crate::taxonomy::{NodeId, Taxonomy, TaxonomyBuilder};

/// Rules added and removed between two indexes.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    pub added: Vec<NormalRule>,
    pub removed: Vec<NormalRule>,
}

impl Delta {
    pub fn between(old: &AxiomIndex, new: &AxiomIndex) -> Self {
        Self {
            added: new.rules().difference(old.rules()).copied().collect(),
            removed: old.rules().difference(new.rules()).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    fn rules(&self) -> impl Iterator<Item = &NormalRule> {
        self.added.iter().chain(self.removed.iter())
    }
}

/// What a changed rule needs to see in a context to have fired there.
#[derive(Default)]
struct Triggers {
    subsumers: HashSet<ConceptId>,
    pairs: Vec<(ConceptId, ConceptId)>,
    features: HashSet<FeatureId>,
    roles: HashSet<RoleId>,
}

impl Triggers {
    fn collect(delta: &Delta, interner: &Interner) -> Self {
        let mut triggers = Self::default();
        for rule in delta.rules() {
            match *rule {
                NormalRule::Subsumption { sub, .. }
                | NormalRule::ExistentialRhs { sub, .. }
                | NormalRule::DatatypeRhs { sub, .. } => {
                    triggers.subsumers.insert(sub);
                }
                NormalRule::ExistentialLhs { filler, .. } => {
                    triggers.subsumers.insert(filler);
                }
                NormalRule::Conjunction { left, right, .. } => triggers.pairs.push((left, right)),
                NormalRule::DatatypeLhs { datatype, .. } => {
                    if let Some(restriction) = interner.restriction_of(datatype) {
                        triggers.features.insert(restriction.feature);
                    }
                }
                NormalRule::RoleInclusion { sub, sup } => {
                    triggers.roles.extend([sub, sup]);
                }
                NormalRule::RoleComposition { first, second, sup } => {
                    triggers.roles.extend([first, second, sup]);
                }
            }
        }
        triggers
    }

    fn role_touched(&self, role: RoleId, old: &AxiomIndex, new: &AxiomIndex) -> bool {
        self.roles.contains(&role)
            || old
                .roles()
                .generalizations_of(role)
                .iter()
                .chain(new.roles().generalizations_of(role))
                .any(|r| self.roles.contains(r))
    }

    fn fires_in(
        &self,
        context: &Context,
        interner: &Interner,
        old: &AxiomIndex,
        new: &AxiomIndex,
    ) -> bool {
        let subsumers = context.subsumers();
        if self.subsumers.iter().any(|c| subsumers.contains(c)) {
            return true;
        }
        if self
            .pairs
            .iter()
            .any(|(a, b)| subsumers.contains(a) && subsumers.contains(b))
        {
            return true;
        }
        if !self.features.is_empty()
            && context.datatypes().iter().any(|&d| {
                interner
                    .restriction_of(d)
                    .is_some_and(|r| self.features.contains(&r.feature))
            })
        {
            return true;
        }
        !self.roles.is_empty()
            && context
                .successors()
                .iter()
                .any(|link| self.role_touched(link.role, old, new))
    }
}

/// Contexts of `previous` that must be recomputed for `new`.
pub fn affected_contexts(
    previous: &Saturation,
    interner: &Interner,
    old: &AxiomIndex,
    new: &AxiomIndex,
    delta: &Delta,
) -> HashSet<ConceptId> {
    let triggers = Triggers::collect(delta, interner);
    let seeds: Vec<ConceptId> = previous
        .contexts()
        .par_iter()
        .enumerate()
        .filter(|(_, context)| triggers.fires_in(context, interner, old, new))
        .map(|(i, _)| ConceptId::from_index(i))
        .collect();

    let mut affected: HashSet<ConceptId> = seeds.iter().copied().collect();
    let mut queue = seeds;
    while let Some(id) = queue.pop() {
        let Some(context) = previous.context(id) else {
            continue;
        };
        for link in context.predecessors() {
            if affected.insert(link.context) {
                queue.push(link.context);
            }
        }
    }
    affected
}

/// The result of an incremental pass.
pub struct Reclassification {
    pub saturation: Saturation,
    pub taxonomy: Taxonomy,
    pub affected_nodes: BTreeSet<NodeId>,
    pub affected_contexts: usize,
    pub stats: SaturationStats,
}

/// Re-classify against `new` starting from the previous saturation and
/// taxonomy. The inputs are not modified, so a failed or cancelled run
/// leaves the previous classification intact.
pub fn reclassify(
    interner: &Interner,
    previous: &Saturation,
    taxonomy: &Taxonomy,
    old: &AxiomIndex,
    new: &AxiomIndex,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<Reclassification, SaturationError> {
    let delta = Delta::between(old, new);
    let affected = affected_contexts(previous, interner, old, new, &delta);
    tracing::info!(
        added = delta.added.len(),
        removed = delta.removed.len(),
        affected = affected.len(),
        contexts = previous.len(),
        "incremental classification"
    );

    let (saturation, stats) = previous.recompute(new, &affected, workers, cancel)?;
    let rebuild = TaxonomyBuilder::new(interner, &saturation).rebuild(taxonomy, &affected);
    tracing::debug!(
        region = rebuild.region,
        affected_nodes = rebuild.affected.len(),
        "taxonomy spliced"
    );

    Ok(Reclassification {
        affected_contexts: affected.len(),
        affected_nodes: rebuild.affected,
        taxonomy: rebuild.taxonomy,
        saturation,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Axiom, Concept, Role};

    fn sub(a: &str, b: &str) -> Axiom {
        Axiom::concept_inclusion(Concept::named(a), Concept::named(b))
    }

    fn full(interner: &mut Interner, axioms: &[Axiom]) -> (AxiomIndex, Saturation, Taxonomy) {
        let index = AxiomIndex::build(interner, axioms).unwrap();
        let (saturation, _) = Saturation::compute(&index, 1, &CancellationToken::new()).unwrap();
        let taxonomy = TaxonomyBuilder::new(interner, &saturation).build();
        (index, saturation, taxonomy)
    }

    #[test]
    fn delta_lists_both_directions() {
        let mut interner = Interner::new();
        let old = AxiomIndex::build(&mut interner, &[sub("A", "B")]).unwrap();
        let new = AxiomIndex::build(&mut interner, &[sub("A", "C")]).unwrap();
        let delta = Delta::between(&old, &new);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.removed.len(), 1);
        assert!(Delta::between(&old, &old).is_empty());
    }

    #[test]
    fn affected_set_closes_over_predecessors() {
        let mut interner = Interner::new();
        let base = vec![
            sub("B", "C"),
            Axiom::concept_inclusion(
                Concept::named("A"),
                Concept::existential(Role::new("r"), Concept::named("B")),
            ),
            sub("Z", "Y"),
        ];
        let (old, saturation, _) = full(&mut interner, &base);
        let mut grown = base.clone();
        grown.push(sub("C", "D"));
        let new = AxiomIndex::build(&mut interner, &grown).unwrap();
        let delta = Delta::between(&old, &new);
        let affected = affected_contexts(&saturation, &interner, &old, &new, &delta);
        let id = |n| interner.concept_id(n).unwrap();
        assert!(affected.contains(&id("B")));
        assert!(affected.contains(&id("C")));
        assert!(affected.contains(&id("A")));
        assert!(!affected.contains(&id("Z")));
    }

    #[test]
    fn incremental_matches_full() {
        let base = vec![sub("A", "B"), sub("C", "B"), sub("E", "F")];
        let mut grown = base.clone();
        grown.push(sub("B", "D"));
        grown.push(sub("D", "B"));

        let mut interner = Interner::new();
        let (old, saturation, taxonomy) = full(&mut interner, &base);
        let new = AxiomIndex::build(&mut interner, &grown).unwrap();
        let result = reclassify(
            &interner,
            &saturation,
            &taxonomy,
            &old,
            &new,
            1,
            &CancellationToken::new(),
        )
        .unwrap();

        let mut fresh = Interner::new();
        let (_, _, expected) = full(&mut fresh, &grown);
        assert!(result.taxonomy.same_structure(&expected));
        result.taxonomy.validate().unwrap();
        // E and F were untouched and keep their node ids.
        assert_eq!(
            result.taxonomy.node("E").unwrap().id(),
            taxonomy.node("E").unwrap().id()
        );
        assert!(result.affected_nodes.contains(&result.taxonomy.node("B").unwrap().id()));
    }
}
