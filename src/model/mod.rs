//! Immutable description-logic expressions and axioms.
//!
//! Expressions are cheap to clone (names and sub-expressions sit behind
//! `Arc`) and compare structurally, so two independently built copies of
//! `∃r.(A ⊓ B)` are equal, hash equally and normalize to the same id.

pub mod literal;
pub mod ontology;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

pub use literal::{Literal, LiteralKind};
pub use ontology::Ontology;

/// Identifier of the reserved top concept (everything).
pub const TOP: &str = "_TOP_";

/// Identifier of the reserved bottom concept (nothing).
pub const BOTTOM: &str = "_BOTTOM_";

// ---------------------------------------------------------------------------
// Roles and features
// ---------------------------------------------------------------------------

/// A named binary relation between concepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role(Arc<str>);

impl Role {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub(crate) fn shared(&self) -> &Arc<str> {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named attribute relating concepts to literal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Feature(Arc<str>);

impl Feature {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub(crate) fn shared(&self) -> &Arc<str> {
        &self.0
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison operator of a datatype restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Equals => "=",
            Self::LessThan => "<",
            Self::LessThanEquals => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEquals => ">=",
        };
        f.write_str(symbol)
    }
}

/// `feature op literal`: the class of things whose feature value satisfies
/// the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Datatype {
    pub feature: Feature,
    pub operator: Operator,
    pub value: Literal,
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.feature, self.operator, self.value)
    }
}

// ---------------------------------------------------------------------------
// Concepts
// ---------------------------------------------------------------------------

/// A concept expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Concept {
    /// An atomic concept, including the reserved [`TOP`] and [`BOTTOM`].
    Named(Arc<str>),
    /// Intersection of the operands. Operands are kept sorted and unique.
    Conjunction(Arc<[Concept]>),
    /// `∃role.filler`.
    Existential { role: Role, filler: Arc<Concept> },
    /// A datatype restriction.
    Datatype(Arc<Datatype>),
}

impl Concept {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    pub fn top() -> Self {
        Self::Named(Arc::from(TOP))
    }

    pub fn bottom() -> Self {
        Self::Named(Arc::from(BOTTOM))
    }

    /// Build a conjunction. Operand order and duplicates do not matter.
    ///
    /// An empty operand list is representable but rejected when indexed.
    pub fn conjunction(operands: impl IntoIterator<Item = Concept>) -> Self {
        let mut operands: Vec<Concept> = operands.into_iter().collect();
        operands.sort();
        operands.dedup();
        Self::Conjunction(operands.into())
    }

    pub fn existential(role: Role, filler: Concept) -> Self {
        Self::Existential {
            role,
            filler: Arc::new(filler),
        }
    }

    pub fn datatype(feature: Feature, operator: Operator, value: impl Into<Literal>) -> Self {
        Self::Datatype(Arc::new(Datatype {
            feature,
            operator,
            value: value.into(),
        }))
    }

    /// The identifier if this is a named concept.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_top(&self) -> bool {
        self.as_named() == Some(TOP)
    }

    pub fn is_bottom(&self) -> bool {
        self.as_named() == Some(BOTTOM)
    }

    /// Visit every named concept mentioned in this expression.
    pub fn for_each_name<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Self::Named(name) => visit(name),
            Self::Conjunction(operands) => {
                for operand in operands.iter() {
                    operand.for_each_name(visit);
                }
            }
            Self::Existential { filler, .. } => filler.for_each_name(visit),
            Self::Datatype(_) => {}
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Conjunction(operands) => {
                f.write_str("(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ⊓ ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Self::Existential { role, filler } => write!(f, "∃{role}.{filler}"),
            Self::Datatype(datatype) => write!(f, "{datatype}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Axioms
// ---------------------------------------------------------------------------

/// A stated axiom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axiom {
    /// `lhs ⊑ rhs`.
    ConceptInclusion { lhs: Concept, rhs: Concept },
    /// `chain[0] ∘ … ∘ chain[n-1] ⊑ rhs`; a single-role chain is a plain
    /// role inclusion.
    RoleInclusion { chain: Vec<Role>, rhs: Role },
}

impl Axiom {
    pub fn concept_inclusion(lhs: Concept, rhs: Concept) -> Self {
        Self::ConceptInclusion { lhs, rhs }
    }

    /// `left ≡ right`, expressed as the two inclusions it stands for.
    pub fn equivalence(left: Concept, right: Concept) -> [Axiom; 2] {
        [
            Self::ConceptInclusion {
                lhs: left.clone(),
                rhs: right.clone(),
            },
            Self::ConceptInclusion {
                lhs: right,
                rhs: left,
            },
        ]
    }

    pub fn role_inclusion(chain: impl IntoIterator<Item = Role>, rhs: Role) -> Self {
        Self::RoleInclusion {
            chain: chain.into_iter().collect(),
            rhs,
        }
    }
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConceptInclusion { lhs, rhs } => write!(f, "{lhs} ⊑ {rhs}"),
            Self::RoleInclusion { chain, rhs } => {
                for (i, role) in chain.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ∘ ")?;
                    }
                    write!(f, "{role}")?;
                }
                write!(f, " ⊑ {rhs}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds expressions for ingestion code, sharing identifier strings.
///
/// Loaders typically create the same identifiers millions of times; the
/// factory hands out one `Arc<str>` per distinct identifier. It is `Sync`,
/// so parallel loaders can share one instance.
#[derive(Debug, Default)]
pub struct Factory {
    names: DashMap<Arc<str>, ()>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    fn share(&self, name: &str) -> Arc<str> {
        if let Some(entry) = self.names.get(name) {
            return entry.key().clone();
        }
        self.names
            .entry(Arc::from(name))
            .or_insert(())
            .key()
            .clone()
    }

    /// Number of distinct identifiers handed out.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn concept(&self, id: &str) -> Concept {
        Concept::Named(self.share(id))
    }

    pub fn role(&self, id: &str) -> Role {
        Role(self.share(id))
    }

    pub fn feature(&self, id: &str) -> Feature {
        Feature(self.share(id))
    }

    pub fn conjunction(&self, operands: impl IntoIterator<Item = Concept>) -> Concept {
        Concept::conjunction(operands)
    }

    pub fn existential(&self, role: Role, filler: Concept) -> Concept {
        Concept::existential(role, filler)
    }

    pub fn datatype(&self, feature: Feature, operator: Operator, value: Literal) -> Concept {
        Concept::datatype(feature, operator, value)
    }

    pub fn boolean_literal(&self, value: bool) -> Literal {
        Literal::Boolean(value)
    }

    pub fn integer_literal(&self, value: i32) -> Literal {
        Literal::Integer(value)
    }

    pub fn long_literal(&self, value: i64) -> Literal {
        Literal::Long(value)
    }

    pub fn float_literal(&self, value: f32) -> Literal {
        Literal::Float(value)
    }

    pub fn double_literal(&self, value: f64) -> Literal {
        Literal::Double(value)
    }

    pub fn date_literal(&self, value: NaiveDate) -> Literal {
        Literal::Date(value)
    }

    /// A string literal sharing its text with equal literals from this
    /// factory.
    pub fn string_literal(&self, value: &str) -> Literal {
        Literal::String(self.share(value))
    }

    pub fn concept_inclusion(&self, lhs: Concept, rhs: Concept) -> Axiom {
        Axiom::concept_inclusion(lhs, rhs)
    }

    pub fn role_inclusion(&self, chain: impl IntoIterator<Item = Role>, rhs: Role) -> Axiom {
        Axiom::role_inclusion(chain, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjunction_is_order_insensitive() {
        let a = Concept::named("A");
        let b = Concept::named("B");
        let left = Concept::conjunction([a.clone(), b.clone(), a.clone()]);
        let right = Concept::conjunction([b, a]);
        assert_eq!(left, right);
    }

    #[test]
    fn equivalence_yields_both_inclusions() {
        let [forward, backward] = Axiom::equivalence(Concept::named("A"), Concept::named("B"));
        assert_eq!(
            forward,
            Axiom::concept_inclusion(Concept::named("A"), Concept::named("B"))
        );
        assert_eq!(
            backward,
            Axiom::concept_inclusion(Concept::named("B"), Concept::named("A"))
        );
    }

    #[test]
    fn factory_shares_names() {
        let factory = Factory::new();
        let Concept::Named(first) = factory.concept("Femur") else {
            panic!("expected named concept");
        };
        let Concept::Named(second) = factory.concept("Femur") else {
            panic!("expected named concept");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn factory_builds_typed_literals() {
        let factory = Factory::new();
        let day = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(factory.date_literal(day).kind(), LiteralKind::Date);
        assert_eq!(factory.long_literal(7).kind(), LiteralKind::Long);
        assert_eq!(factory.float_literal(0.5).kind(), LiteralKind::Float);
        assert_eq!(factory.string_literal("red"), Literal::from("red"));
    }

    #[test]
    fn names_are_collected() {
        let expr = Concept::conjunction([
            Concept::named("Fracture"),
            Concept::existential(Role::new("site"), Concept::named("Femur")),
        ]);
        let mut names = Vec::new();
        expr.for_each_name(&mut |n| names.push(n));
        names.sort();
        assert_eq!(names, vec!["Femur", "Fracture"]);
    }

    #[test]
    fn display_is_readable() {
        let axiom = Axiom::role_inclusion([Role::new("r"), Role::new("s")], Role::new("t"));
        assert_eq!(axiom.to_string(), "r ∘ s ⊑ t");
        assert!(Concept::top().is_top());
    }
}
