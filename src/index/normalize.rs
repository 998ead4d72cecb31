//! Structural transformation of stated axioms into normal-form rules.
//!
//! Compound sub-expressions are replaced by synthetic concepts. A synthetic
//! concept only receives the definitional half it needs at the position it
//! occurs in (`S ⊑ C` on the right-hand side, `C ⊑ S` on the left), so no
//! consequence over the original names is gained or lost.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::model::{Axiom, Concept, Datatype, Operator, Role};

use super::interner::{ConceptId, DatatypeId, Interner, RoleId};
use super::restriction::Restriction;

/// One normal-form rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NormalRule {
    /// `sub ⊑ sup`
    Subsumption { sub: ConceptId, sup: ConceptId },
    /// `left ⊓ right ⊑ sup`, with `left <= right`
    Conjunction {
        left: ConceptId,
        right: ConceptId,
        sup: ConceptId,
    },
    /// `sub ⊑ ∃role.filler`
    ExistentialRhs {
        sub: ConceptId,
        role: RoleId,
        filler: ConceptId,
    },
    /// `∃role.filler ⊑ sup`
    ExistentialLhs {
        role: RoleId,
        filler: ConceptId,
        sup: ConceptId,
    },
    /// `sub ⊑ sup` over roles
    RoleInclusion { sub: RoleId, sup: RoleId },
    /// `first ∘ second ⊑ sup`
    RoleComposition {
        first: RoleId,
        second: RoleId,
        sup: RoleId,
    },
    /// `sub ⊑ datatype`
    DatatypeRhs { sub: ConceptId, datatype: DatatypeId },
    /// `datatype ⊑ sup`
    DatatypeLhs { datatype: DatatypeId, sup: ConceptId },
}

#[derive(Clone, Copy)]
enum Polarity {
    /// Left-hand side: the expression must imply its synthetic name.
    Negative,
    /// Right-hand side: the synthetic name must imply the expression.
    Positive,
}

/// Accumulates the rules for a batch of axioms.
pub struct Normalizer<'a> {
    interner: &'a mut Interner,
    rules: BTreeSet<NormalRule>,
}

impl<'a> Normalizer<'a> {
    pub fn new(interner: &'a mut Interner) -> Self {
        Self {
            interner,
            rules: BTreeSet::new(),
        }
    }

    pub fn finish(self) -> BTreeSet<NormalRule> {
        self.rules
    }

    pub fn axiom(&mut self, axiom: &Axiom) -> Result<(), IndexError> {
        match axiom {
            Axiom::ConceptInclusion { lhs, rhs } => {
                let sub = self.lhs(lhs)?;
                self.include(sub, rhs)
            }
            Axiom::RoleInclusion { chain, rhs } => self.role_chain(chain, rhs),
        }
    }

    fn lhs(&mut self, concept: &Concept) -> Result<ConceptId, IndexError> {
        match concept {
            Concept::Named(name) => self.interner.concept(name),
            Concept::Conjunction(operands) => {
                let ids = operands
                    .iter()
                    .map(|op| self.lhs(op))
                    .collect::<Result<Vec<_>, _>>()?;
                self.conjoin(ids, Polarity::Negative)
            }
            Concept::Existential { role, filler } => {
                let role = self.role(role)?;
                let filler = self.lhs(filler)?;
                let sup = self.interner.existential(role, filler);
                self.rules
                    .insert(NormalRule::ExistentialLhs { role, filler, sup });
                Ok(sup)
            }
            Concept::Datatype(datatype) => {
                let datatype = self.restriction(datatype)?;
                let sup = self.interner.datatype_concept(datatype);
                self.rules.insert(NormalRule::DatatypeLhs { datatype, sup });
                Ok(sup)
            }
        }
    }

    fn rhs(&mut self, concept: &Concept) -> Result<ConceptId, IndexError> {
        match concept {
            Concept::Named(name) => self.interner.concept(name),
            Concept::Conjunction(operands) => {
                let ids = operands
                    .iter()
                    .map(|op| self.rhs(op))
                    .collect::<Result<Vec<_>, _>>()?;
                self.conjoin(ids, Polarity::Positive)
            }
            Concept::Existential { role, filler } => {
                let role = self.role(role)?;
                let filler = self.rhs(filler)?;
                let sub = self.interner.existential(role, filler);
                self.rules
                    .insert(NormalRule::ExistentialRhs { sub, role, filler });
                Ok(sub)
            }
            Concept::Datatype(datatype) => {
                let datatype = self.restriction(datatype)?;
                let sub = self.interner.datatype_concept(datatype);
                self.rules.insert(NormalRule::DatatypeRhs { sub, datatype });
                Ok(sub)
            }
        }
    }

    /// Emit the rules for `sub ⊑ sup`, splitting right-hand conjunctions.
    fn include(&mut self, sub: ConceptId, sup: &Concept) -> Result<(), IndexError> {
        match sup {
            Concept::Named(name) => {
                let sup = self.interner.concept(name)?;
                if sup != sub {
                    self.rules.insert(NormalRule::Subsumption { sub, sup });
                }
            }
            Concept::Conjunction(operands) => {
                if operands.is_empty() {
                    return Err(IndexError::EmptyConjunction);
                }
                for operand in operands.iter() {
                    self.include(sub, operand)?;
                }
            }
            Concept::Existential { role, filler } => {
                let role = self.role(role)?;
                let filler = self.rhs(filler)?;
                self.rules
                    .insert(NormalRule::ExistentialRhs { sub, role, filler });
            }
            Concept::Datatype(datatype) => {
                let datatype = self.restriction(datatype)?;
                self.rules.insert(NormalRule::DatatypeRhs { sub, datatype });
            }
        }
        Ok(())
    }

    /// Binarize a conjunction over sorted operand ids.
    fn conjoin(&mut self, mut ids: Vec<ConceptId>, polarity: Polarity) -> Result<ConceptId, IndexError> {
        ids.sort_unstable();
        ids.dedup();
        let Some((&first, rest)) = ids.split_first() else {
            return Err(IndexError::EmptyConjunction);
        };
        let mut acc = first;
        for &next in rest {
            let joined = self.interner.conjunction(acc, next);
            match polarity {
                Polarity::Negative => {
                    let (left, right) = if acc <= next { (acc, next) } else { (next, acc) };
                    self.rules.insert(NormalRule::Conjunction {
                        left,
                        right,
                        sup: joined,
                    });
                }
                Polarity::Positive => {
                    self.rules.insert(NormalRule::Subsumption {
                        sub: joined,
                        sup: acc,
                    });
                    self.rules.insert(NormalRule::Subsumption {
                        sub: joined,
                        sup: next,
                    });
                }
            }
            acc = joined;
        }
        Ok(acc)
    }

    fn role_chain(&mut self, chain: &[Role], rhs: &Role) -> Result<(), IndexError> {
        let ids = chain
            .iter()
            .map(|role| self.role(role))
            .collect::<Result<Vec<_>, _>>()?;
        let sup = self.role(rhs)?;
        match ids.as_slice() {
            [] => Err(IndexError::EmptyRoleChain),
            [sub] => {
                if *sub != sup {
                    self.rules
                        .insert(NormalRule::RoleInclusion { sub: *sub, sup });
                }
                Ok(())
            }
            [first, rest @ ..] => {
                let mut acc = *first;
                for (i, &second) in rest.iter().enumerate() {
                    let target = if i + 1 == rest.len() {
                        sup
                    } else {
                        self.interner.chain_role(acc, second)
                    };
                    self.rules.insert(NormalRule::RoleComposition {
                        first: acc,
                        second,
                        sup: target,
                    });
                    acc = target;
                }
                Ok(())
            }
        }
    }

    fn role(&mut self, role: &Role) -> Result<RoleId, IndexError> {
        self.interner.role(role.shared())
    }

    fn restriction(&mut self, datatype: &Datatype) -> Result<DatatypeId, IndexError> {
        datatype.value.validate()?;
        let kind = datatype.value.kind();
        if !kind.is_ordered() && datatype.operator != Operator::Equals {
            return Err(IndexError::UnsupportedOperator {
                feature: datatype.feature.to_string(),
                operator: datatype.operator.to_string(),
                kind: kind.to_string(),
            });
        }
        let feature = self.interner.feature(datatype.feature.shared(), kind)?;
        Ok(self.interner.restriction(Restriction {
            feature,
            operator: datatype.operator,
            value: datatype.value.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feature, Literal};

    fn normalize(axioms: &[Axiom]) -> (Interner, BTreeSet<NormalRule>) {
        let mut interner = Interner::new();
        let mut normalizer = Normalizer::new(&mut interner);
        for axiom in axioms {
            normalizer.axiom(axiom).unwrap();
        }
        let rules = normalizer.finish();
        (interner, rules)
    }

    fn a(name: &str) -> Concept {
        Concept::named(name)
    }

    #[test]
    fn named_inclusion_is_one_rule() {
        let (interner, rules) = normalize(&[Axiom::concept_inclusion(a("A"), a("B"))]);
        let sub = interner.concept_id("A").unwrap();
        let sup = interner.concept_id("B").unwrap();
        assert_eq!(
            rules.into_iter().collect::<Vec<_>>(),
            vec![NormalRule::Subsumption { sub, sup }]
        );
    }

    #[test]
    fn rhs_conjunction_splits() {
        let (interner, rules) = normalize(&[Axiom::concept_inclusion(
            a("A"),
            Concept::conjunction([a("B"), a("C")]),
        )]);
        let id = |n| interner.concept_id(n).unwrap();
        assert!(rules.contains(&NormalRule::Subsumption { sub: id("A"), sup: id("B") }));
        assert!(rules.contains(&NormalRule::Subsumption { sub: id("A"), sup: id("C") }));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn lhs_conjunction_binarizes() {
        let (_, rules) = normalize(&[Axiom::concept_inclusion(
            Concept::conjunction([a("A"), a("B"), a("C")]),
            a("D"),
        )]);
        let conjunctions = rules
            .iter()
            .filter(|r| matches!(r, NormalRule::Conjunction { .. }))
            .count();
        assert_eq!(conjunctions, 2);
    }

    #[test]
    fn normalization_is_idempotent() {
        let axiom = Axiom::concept_inclusion(
            Concept::existential(
                Role::new("r"),
                Concept::conjunction([a("A"), a("B")]),
            ),
            a("C"),
        );
        let mut interner = Interner::new();
        let mut first = Normalizer::new(&mut interner);
        first.axiom(&axiom).unwrap();
        let first = first.finish();
        let mut second = Normalizer::new(&mut interner);
        second.axiom(&axiom).unwrap();
        assert_eq!(first, second.finish());
    }

    #[test]
    fn long_chains_use_synthetic_roles() {
        let (interner, rules) = normalize(&[Axiom::role_inclusion(
            [Role::new("a"), Role::new("b"), Role::new("c")],
            Role::new("d"),
        )]);
        let compositions: Vec<_> = rules
            .iter()
            .filter(|r| matches!(r, NormalRule::RoleComposition { .. }))
            .collect();
        assert_eq!(compositions.len(), 2);
        // a, b, c, d plus one synthetic prefix role.
        assert_eq!(interner.role_count(), 5);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let mut interner = Interner::new();
        let mut normalizer = Normalizer::new(&mut interner);
        let err = normalizer
            .axiom(&Axiom::concept_inclusion(Concept::conjunction([]), a("A")))
            .unwrap_err();
        assert!(matches!(err, IndexError::EmptyConjunction));
        let err = normalizer
            .axiom(&Axiom::role_inclusion([], Role::new("r")))
            .unwrap_err();
        assert!(matches!(err, IndexError::EmptyRoleChain));
    }

    #[test]
    fn boolean_ordering_is_rejected() {
        let mut interner = Interner::new();
        let mut normalizer = Normalizer::new(&mut interner);
        let axiom = Axiom::concept_inclusion(
            a("A"),
            Concept::datatype(Feature::new("flag"), Operator::LessThan, Literal::Boolean(true)),
        );
        assert!(matches!(
            normalizer.axiom(&axiom),
            Err(IndexError::UnsupportedOperator { .. })
        ));
    }
}
