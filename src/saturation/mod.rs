//! Saturation: derive every entailed subsumer of every concept.
//!
//! Each concept id owns a [`Context`] holding what has been derived for it
//! so far: its subsumers, the existential links leaving it (successors), the
//! links arriving at it (predecessors) and the datatype restrictions it
//! satisfies. Contexts exchange messages ([`Item`]s) until no rule produces
//! anything new. The result is independent of worker count and scheduling.

mod worker;

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::SaturationError;
use crate::index::{AxiomIndex, ConceptId, DatatypeId, RoleHierarchy, RoleId};

use worker::Workspace;

/// An existential edge `∃role.context` between two contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub role: RoleId,
    pub context: ConceptId,
}

/// Everything derived for one concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    subsumers: HashSet<ConceptId>,
    /// Links leaving this context: `self ⊑ ∃role.context`.
    successors: HashSet<Link>,
    /// Links arriving here: `context ⊑ ∃role.self`.
    predecessors: HashSet<Link>,
    datatypes: HashSet<DatatypeId>,
}

impl Context {
    pub fn subsumers(&self) -> &HashSet<ConceptId> {
        &self.subsumers
    }

    pub fn successors(&self) -> &HashSet<Link> {
        &self.successors
    }

    pub fn predecessors(&self) -> &HashSet<Link> {
        &self.predecessors
    }

    pub fn datatypes(&self) -> &HashSet<DatatypeId> {
        &self.datatypes
    }

    pub fn is_unsatisfiable(&self) -> bool {
        self.subsumers.contains(&ConceptId::BOTTOM)
    }
}

/// A message delivered to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Item {
    Subsumer(ConceptId),
    Link(Link),
    Predecessor(Link),
    Datatype(DatatypeId),
}

/// Size of a saturation pass, for logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaturationStats {
    pub contexts: usize,
    pub seeded: usize,
    pub processed: u64,
    pub elapsed_ms: u128,
}

/// The frozen outcome of a saturation pass, indexed by concept id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Saturation {
    contexts: Vec<Context>,
}

impl Saturation {
    /// Saturate every concept known to `index` from scratch.
    pub fn compute(
        index: &AxiomIndex,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<(Self, SaturationStats), SaturationError> {
        let contexts = vec![Context::default(); index.concept_count()];
        let seeds: Vec<ConceptId> = (0..index.concept_count())
            .map(ConceptId::from_index)
            .collect();
        run(index, contexts, &seeds, workers, cancel)
    }

    /// Re-saturate after a rule change.
    ///
    /// `affected` must be closed under predecessors in `self`: every context
    /// with a link into an affected context is affected itself. Affected
    /// contexts are recomputed from scratch, new concept ids are saturated
    /// for the first time, and all other contexts keep their state while
    /// still reacting to messages from re-derived links.
    pub fn recompute(
        &self,
        index: &AxiomIndex,
        affected: &HashSet<ConceptId>,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<(Self, SaturationStats), SaturationError> {
        let previous_len = self.contexts.len();
        let mut contexts = self.contexts.clone();
        contexts.resize_with(index.concept_count().max(previous_len), Context::default);

        for id in affected {
            if let Some(context) = contexts.get_mut(id.index()) {
                *context = Context::default();
            }
        }
        contexts.par_iter_mut().for_each(|context| {
            context
                .predecessors
                .retain(|link| !affected.contains(&link.context));
        });

        let mut seeds: Vec<ConceptId> = affected.iter().copied().collect();
        seeds.extend((previous_len..contexts.len()).map(ConceptId::from_index));
        seeds.sort_unstable();
        run(index, contexts, &seeds, workers, cancel)
    }

    pub fn context(&self, id: ConceptId) -> Option<&Context> {
        self.contexts.get(id.index())
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// `sub ⊑ sup` holds (trivially so when `sub` is unsatisfiable).
    pub fn subsumes(&self, sub: ConceptId, sup: ConceptId) -> bool {
        self.context(sub).is_some_and(|context| {
            context.is_unsatisfiable() || context.subsumers.contains(&sup)
        })
    }

    pub fn is_satisfiable(&self, id: ConceptId) -> bool {
        self.context(id).is_some_and(|context| !context.is_unsatisfiable())
    }

    /// A link over `role` (or a sub-role) from `from` to `to` was derived.
    pub fn has_link(&self, from: ConceptId, role: RoleId, to: ConceptId, roles: &RoleHierarchy) -> bool {
        self.context(from).is_some_and(|context| {
            context
                .successors
                .iter()
                .any(|link| link.context == to && roles.is_subrole(link.role, role))
        })
    }

    /// `from ⊑ ∃role.filler` holds.
    pub fn has_existential(
        &self,
        from: ConceptId,
        role: RoleId,
        filler: ConceptId,
        roles: &RoleHierarchy,
    ) -> bool {
        let Some(context) = self.context(from) else {
            return false;
        };
        context.is_unsatisfiable()
            || context.successors.iter().any(|link| {
                roles.is_subrole(link.role, role) && self.subsumes(link.context, filler)
            })
    }
}

fn run(
    index: &AxiomIndex,
    contexts: Vec<Context>,
    seeds: &[ConceptId],
    workers: usize,
    cancel: &CancellationToken,
) -> Result<(Saturation, SaturationStats), SaturationError> {
    let started = Instant::now();
    let workspace = Workspace::new(index, cancel, contexts);
    for &seed in seeds {
        workspace.seed(seed);
    }
    tracing::debug!(
        contexts = workspace.len(),
        seeds = seeds.len(),
        workers,
        "saturation started"
    );
    let processed = workspace.run(workers)?;
    let contexts = workspace.into_contexts();
    let stats = SaturationStats {
        contexts: contexts.len(),
        seeded: seeds.len(),
        processed,
        elapsed_ms: started.elapsed().as_millis(),
    };
    tracing::debug!(
        processed = stats.processed,
        elapsed_ms = stats.elapsed_ms as u64,
        "saturation finished"
    );
    Ok((Saturation { contexts }, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Interner;
    use crate::model::{Axiom, Concept, Role};

    fn saturate(axioms: &[Axiom], workers: usize) -> (Interner, AxiomIndex, Saturation) {
        let mut interner = Interner::new();
        let index = AxiomIndex::build(&mut interner, axioms).unwrap();
        let (saturation, _) =
            Saturation::compute(&index, workers, &CancellationToken::new()).unwrap();
        (interner, index, saturation)
    }

    fn c(name: &str) -> Concept {
        Concept::named(name)
    }

    fn sub(a: Concept, b: Concept) -> Axiom {
        Axiom::concept_inclusion(a, b)
    }

    #[test]
    fn told_subsumptions_are_transitive() {
        let (interner, _, saturation) = saturate(&[sub(c("A"), c("B")), sub(c("B"), c("C"))], 1);
        let id = |n| interner.concept_id(n).unwrap();
        assert!(saturation.subsumes(id("A"), id("C")));
        assert!(saturation.subsumes(id("A"), ConceptId::TOP));
        assert!(!saturation.subsumes(id("C"), id("A")));
    }

    #[test]
    fn conjunction_fires_on_both_operands() {
        let (interner, _, saturation) = saturate(
            &[
                sub(c("X"), c("A")),
                sub(c("X"), c("B")),
                sub(Concept::conjunction([c("A"), c("B")]), c("C")),
            ],
            1,
        );
        let id = |n| interner.concept_id(n).unwrap();
        assert!(saturation.subsumes(id("X"), id("C")));
        assert!(!saturation.subsumes(id("A"), id("C")));
    }

    #[test]
    fn existential_follows_role_hierarchy() {
        let r1 = Role::new("r1");
        let r2 = Role::new("r2");
        let (interner, index, saturation) = saturate(
            &[
                sub(c("A"), Concept::existential(r1.clone(), c("B"))),
                Axiom::role_inclusion([r1], r2.clone()),
                sub(Concept::existential(r2, c("B")), c("C")),
            ],
            1,
        );
        let id = |n| interner.concept_id(n).unwrap();
        let r2 = interner.role_id("r2").unwrap();
        assert!(saturation.has_existential(id("A"), r2, id("B"), index.roles()));
        assert!(saturation.subsumes(id("A"), id("C")));
    }

    #[test]
    fn role_composition_adds_links() {
        let (interner, index, saturation) = saturate(
            &[
                sub(c("A"), Concept::existential(Role::new("r1"), c("B"))),
                sub(c("B"), Concept::existential(Role::new("r2"), c("C"))),
                Axiom::role_inclusion([Role::new("r1"), Role::new("r2")], Role::new("r3")),
            ],
            1,
        );
        let id = |n| interner.concept_id(n).unwrap();
        let r3 = interner.role_id("r3").unwrap();
        assert!(saturation.has_link(id("A"), r3, id("C"), index.roles()));
    }

    #[test]
    fn bottom_propagates_to_predecessors() {
        let (interner, _, saturation) = saturate(
            &[
                sub(c("B"), Concept::bottom()),
                sub(c("A"), Concept::existential(Role::new("r"), c("B"))),
            ],
            1,
        );
        let id = |n| interner.concept_id(n).unwrap();
        assert!(!saturation.is_satisfiable(id("B")));
        assert!(!saturation.is_satisfiable(id("A")));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut axioms = Vec::new();
        for i in 0..200 {
            axioms.push(sub(c(&format!("N{i}")), c(&format!("N{}", i / 2))));
            axioms.push(sub(
                c(&format!("N{i}")),
                Concept::existential(Role::new("part-of"), c(&format!("N{}", i / 3))),
            ));
        }
        axioms.push(sub(Concept::existential(Role::new("part-of"), c("N7")), c("Part7")));
        let (_, _, sequential) = saturate(&axioms, 1);
        let (_, _, parallel) = saturate(&axioms, 4);
        assert_eq!(sequential.contexts(), parallel.contexts());
    }

    #[test]
    fn narrow_worklist_with_idle_workers_terminates() {
        // A single existential chain keeps at most a couple of contexts
        // active, so most workers spend the run parked.
        let mut axioms = Vec::new();
        for i in 0..300 {
            axioms.push(sub(
                c(&format!("L{i}")),
                Concept::existential(Role::new("next"), c(&format!("L{}", i + 1))),
            ));
        }
        axioms.push(sub(c("L300"), Concept::bottom()));
        let (interner, _, sequential) = saturate(&axioms, 1);
        let (_, _, parallel) = saturate(&axioms, 8);
        assert_eq!(sequential.contexts(), parallel.contexts());
        assert!(!parallel.is_satisfiable(interner.concept_id("L0").unwrap()));
    }

    #[test]
    fn cancelled_run_reports_error() {
        let mut interner = Interner::new();
        let index = AxiomIndex::build(&mut interner, &[sub(c("A"), c("B"))]).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = Saturation::compute(&index, 1, &token).unwrap_err();
        assert!(matches!(err, SaturationError::Cancelled { .. }));
    }
}
