//! Axiom index: normalized rules and the lookup tables saturation fires from.
//!
//! The index is immutable once built. Any change to the stated axioms
//! produces a fresh index (built against a clone of the session interner so
//! ids stay stable), and the old and new rule sets are diffed to drive
//! incremental classification.

pub mod interner;
pub mod normalize;
pub mod restriction;
pub mod role_hierarchy;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::model::Axiom;

pub use interner::{ConceptId, ConceptOrigin, DatatypeId, FeatureId, Interner, RoleId};
pub use normalize::{NormalRule, Normalizer};
pub use restriction::{Interval, Restriction};
pub use role_hierarchy::RoleHierarchy;

/// Rules grouped by the premise that triggers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxiomIndex {
    rules: BTreeSet<NormalRule>,
    /// Number of concept ids allocated when the index was built.
    concept_count: usize,
    /// `A` → every `B` with `A ⊑ B`.
    subsumptions: HashMap<ConceptId, Vec<ConceptId>>,
    /// Operand → `(other operand, sup)` for each `A ⊓ B ⊑ C`.
    conjunctions: HashMap<ConceptId, Vec<(ConceptId, ConceptId)>>,
    /// `A` → `(r, B)` for each `A ⊑ ∃r.B`.
    existentials_rhs: HashMap<ConceptId, Vec<(RoleId, ConceptId)>>,
    /// Filler `B` → `(r, C)` for each `∃r.B ⊑ C`.
    existentials_lhs: HashMap<ConceptId, Vec<(RoleId, ConceptId)>>,
    roles: RoleHierarchy,
    /// `A` → restrictions `d` with `A ⊑ d`.
    datatypes_rhs: HashMap<ConceptId, Vec<DatatypeId>>,
    /// Every restriction a rule mentions.
    restrictions: HashMap<DatatypeId, Restriction>,
    /// Feature → `(d, C)` for each `d ⊑ C` restricting that feature.
    datatype_premises: HashMap<FeatureId, Vec<(DatatypeId, ConceptId)>>,
    /// Restriction → restrictions it cannot hold together with.
    datatype_conflicts: HashMap<DatatypeId, Vec<DatatypeId>>,
}

impl AxiomIndex {
    /// Normalize `axioms` into `interner` and index the resulting rules.
    ///
    /// On error the interner may hold ids for part of the input; callers
    /// that need atomicity build against a clone.
    pub fn build<'a>(
        interner: &mut Interner,
        axioms: impl IntoIterator<Item = &'a Axiom>,
    ) -> Result<Self, IndexError> {
        let mut normalizer = Normalizer::new(interner);
        for axiom in axioms {
            normalizer.axiom(axiom)?;
        }
        let rules = normalizer.finish();
        Self::from_rules(interner, rules)
    }

    /// Index an already normalized rule set.
    pub fn from_rules(interner: &Interner, rules: BTreeSet<NormalRule>) -> Result<Self, IndexError> {
        let mut index = Self {
            concept_count: interner.concept_count(),
            ..Self::default()
        };
        let mut role_inclusions = Vec::new();
        let mut role_compositions = Vec::new();
        let mut rhs_datatypes: BTreeSet<DatatypeId> = BTreeSet::new();
        let mut lhs_datatypes: Vec<(DatatypeId, ConceptId)> = Vec::new();

        for rule in &rules {
            match *rule {
                NormalRule::Subsumption { sub, sup } => {
                    index.subsumptions.entry(sub).or_default().push(sup);
                }
                NormalRule::Conjunction { left, right, sup } => {
                    index.conjunctions.entry(left).or_default().push((right, sup));
                    if left != right {
                        index.conjunctions.entry(right).or_default().push((left, sup));
                    }
                }
                NormalRule::ExistentialRhs { sub, role, filler } => {
                    index.existentials_rhs.entry(sub).or_default().push((role, filler));
                }
                NormalRule::ExistentialLhs { role, filler, sup } => {
                    index.existentials_lhs.entry(filler).or_default().push((role, sup));
                }
                NormalRule::RoleInclusion { sub, sup } => role_inclusions.push((sub, sup)),
                NormalRule::RoleComposition { first, second, sup } => {
                    role_compositions.push((first, second, sup));
                }
                NormalRule::DatatypeRhs { sub, datatype } => {
                    index.datatypes_rhs.entry(sub).or_default().push(datatype);
                    rhs_datatypes.insert(datatype);
                }
                NormalRule::DatatypeLhs { datatype, sup } => lhs_datatypes.push((datatype, sup)),
            }
        }

        index.roles = RoleHierarchy::build(&role_inclusions, &role_compositions);
        index.index_datatypes(interner, &rhs_datatypes, &lhs_datatypes)?;
        index.rules = rules;
        Ok(index)
    }

    /// Group left-hand restriction rules by feature, and precompute which
    /// derivable restrictions contradict each other.
    fn index_datatypes(
        &mut self,
        interner: &Interner,
        rhs: &BTreeSet<DatatypeId>,
        lhs: &[(DatatypeId, ConceptId)],
    ) -> Result<(), IndexError> {
        let restriction = |id: DatatypeId| interner.restriction_of(id);

        let mut by_feature: HashMap<FeatureId, Vec<(DatatypeId, &Restriction)>> = HashMap::new();
        for &d in rhs {
            if let Some(derived) = restriction(d) {
                by_feature.entry(derived.feature).or_default().push((d, derived));
                self.restrictions.insert(d, derived.clone());
            }
        }

        for &(d, sup) in lhs {
            let Some(premise) = restriction(d) else {
                continue;
            };
            // Premises on features nothing derives can never fire.
            let Some(group) = by_feature.get(&premise.feature) else {
                continue;
            };
            // Surface literal type clashes at build time, not mid-saturation.
            for &(_, derived) in group {
                derived.implies(premise)?;
            }
            self.restrictions.insert(d, premise.clone());
            self.datatype_premises.entry(premise.feature).or_default().push((d, sup));
        }

        for group in by_feature.values() {
            for (i, &(a, first)) in group.iter().enumerate() {
                for &(b, second) in &group[i..] {
                    if first.conflicts(second)? {
                        self.datatype_conflicts.entry(a).or_default().push(b);
                        if a != b {
                            self.datatype_conflicts.entry(b).or_default().push(a);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups used by saturation
    // -----------------------------------------------------------------------

    pub fn subsumptions(&self, concept: ConceptId) -> &[ConceptId] {
        slice(self.subsumptions.get(&concept))
    }

    pub fn conjunctions(&self, operand: ConceptId) -> &[(ConceptId, ConceptId)] {
        slice(self.conjunctions.get(&operand))
    }

    pub fn existentials_rhs(&self, concept: ConceptId) -> &[(RoleId, ConceptId)] {
        slice(self.existentials_rhs.get(&concept))
    }

    pub fn existentials_lhs(&self, filler: ConceptId) -> &[(RoleId, ConceptId)] {
        slice(self.existentials_lhs.get(&filler))
    }

    pub fn datatypes_rhs(&self, concept: ConceptId) -> &[DatatypeId] {
        slice(self.datatypes_rhs.get(&concept))
    }

    pub fn feature_of(&self, datatype: DatatypeId) -> Option<FeatureId> {
        self.restrictions.get(&datatype).map(|r| r.feature)
    }

    /// Concepts `C` with `d ⊑ C` where `d` restricts `feature` and every
    /// value admitted by all `held` restrictions on `feature` satisfies `d`.
    ///
    /// Bounds stated separately combine: `f ≥ 18` and `f ≤ 18` together
    /// trigger a rule on `f = 18`. An empty combination yields nothing,
    /// since the conflict table already makes such a context unsatisfiable.
    pub fn datatype_implications(
        &self,
        feature: FeatureId,
        held: impl IntoIterator<Item = DatatypeId>,
    ) -> Vec<ConceptId> {
        let Some(premises) = self.datatype_premises.get(&feature) else {
            return Vec::new();
        };
        let mut combined = Interval::unbounded();
        for d in held {
            let Some(r) = self.restrictions.get(&d).filter(|r| r.feature == feature) else {
                continue;
            };
            let Some(interval) = r.interval() else {
                return Vec::new();
            };
            combined = match combined.intersect(interval) {
                Ok(combined) => combined,
                Err(_) => return Vec::new(),
            };
        }
        if combined.is_empty().unwrap_or(true) {
            return Vec::new();
        }
        premises
            .iter()
            .filter(|(d, _)| {
                self.restrictions
                    .get(d)
                    .and_then(Restriction::interval)
                    .is_some_and(|premise| combined.within(&premise).unwrap_or(false))
            })
            .map(|&(_, sup)| sup)
            .collect()
    }

    pub fn datatype_conflicts(&self, datatype: DatatypeId) -> &[DatatypeId] {
        slice(self.datatype_conflicts.get(&datatype))
    }

    pub fn roles(&self) -> &RoleHierarchy {
        &self.roles
    }

    pub fn rules(&self) -> &BTreeSet<NormalRule> {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn concept_count(&self) -> usize {
        self.concept_count
    }
}

fn slice<T>(entry: Option<&Vec<T>>) -> &[T] {
    entry.map(|v| v.as_slice()).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Concept, Feature, Operator, Role};

    fn build(axioms: &[Axiom]) -> (Interner, AxiomIndex) {
        let mut interner = Interner::new();
        let index = AxiomIndex::build(&mut interner, axioms).unwrap();
        (interner, index)
    }

    #[test]
    fn conjunctions_are_indexed_by_both_operands() {
        let (interner, index) = build(&[Axiom::concept_inclusion(
            Concept::conjunction([Concept::named("A"), Concept::named("B")]),
            Concept::named("C"),
        )]);
        let a = interner.concept_id("A").unwrap();
        let b = interner.concept_id("B").unwrap();
        assert_eq!(index.conjunctions(a).len(), 1);
        assert_eq!(index.conjunctions(b).len(), 1);
        assert_eq!(index.conjunctions(a)[0].0, b);
    }

    #[test]
    fn role_hierarchy_is_closed() {
        let (interner, index) = build(&[
            Axiom::role_inclusion([Role::new("r")], Role::new("s")),
            Axiom::role_inclusion([Role::new("s")], Role::new("t")),
        ]);
        let r = interner.role_id("r").unwrap();
        let t = interner.role_id("t").unwrap();
        assert!(index.roles().is_subrole(r, t));
    }

    #[test]
    fn datatype_implications_follow_intervals() {
        let age = Feature::new("age");
        let (interner, index) = build(&[
            Axiom::concept_inclusion(
                Concept::named("Adult"),
                Concept::datatype(age.clone(), Operator::Equals, 40),
            ),
            Axiom::concept_inclusion(
                Concept::datatype(age.clone(), Operator::GreaterThanEquals, 18),
                Concept::named("Grown"),
            ),
        ]);
        let adult = interner.concept_id("Adult").unwrap();
        let grown = interner.concept_id("Grown").unwrap();
        let forty = index.datatypes_rhs(adult)[0];
        let feature = index.feature_of(forty).unwrap();
        let fired = index.datatype_implications(feature, [forty]);
        assert_eq!(fired.len(), 1);
        assert!(index.subsumptions(fired[0]).contains(&grown));
        assert!(index.datatype_implications(feature, []).is_empty());
    }

    #[test]
    fn separate_bounds_combine_into_one_premise() {
        let age = Feature::new("age");
        let (interner, index) = build(&[
            Axiom::concept_inclusion(
                Concept::named("Low"),
                Concept::datatype(age.clone(), Operator::GreaterThanEquals, 18),
            ),
            Axiom::concept_inclusion(
                Concept::named("High"),
                Concept::datatype(age.clone(), Operator::LessThanEquals, 18),
            ),
            Axiom::concept_inclusion(
                Concept::datatype(age.clone(), Operator::Equals, 18),
                Concept::named("Exactly"),
            ),
        ]);
        let low = index.datatypes_rhs(interner.concept_id("Low").unwrap())[0];
        let high = index.datatypes_rhs(interner.concept_id("High").unwrap())[0];
        let exactly = interner.concept_id("Exactly").unwrap();
        let feature = index.feature_of(low).unwrap();
        assert!(index.datatype_implications(feature, [low]).is_empty());
        assert!(index.datatype_implications(feature, [high]).is_empty());
        let fired = index.datatype_implications(feature, [low, high]);
        assert_eq!(fired.len(), 1);
        assert!(index.subsumptions(fired[0]).contains(&exactly));
    }

    #[test]
    fn contradictory_datatypes_conflict() {
        let size = Feature::new("size");
        let (_, index) = build(&[
            Axiom::concept_inclusion(
                Concept::named("A"),
                Concept::datatype(size.clone(), Operator::Equals, 1),
            ),
            Axiom::concept_inclusion(
                Concept::named("B"),
                Concept::datatype(size.clone(), Operator::Equals, 2),
            ),
        ]);
        assert_eq!(index.datatype_conflicts.len(), 2);
    }

    #[test]
    fn feature_type_conflicts_are_rejected() {
        let mut interner = Interner::new();
        let err = AxiomIndex::build(
            &mut interner,
            &[
                Axiom::concept_inclusion(
                    Concept::named("A"),
                    Concept::datatype(Feature::new("size"), Operator::Equals, 1),
                ),
                Axiom::concept_inclusion(
                    Concept::named("B"),
                    Concept::datatype(Feature::new("size"), Operator::Equals, "large"),
                ),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::FeatureTypeMismatch { .. }));
    }
}
