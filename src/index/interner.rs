//! Stable numeric ids for concepts, roles, features and restrictions.
//!
//! Named concepts and the synthetic concepts introduced by normalization
//! share one id space so the saturation engine can address every context
//! by a dense `u32`. Synthetic concepts are hash-consed on their structure,
//! which makes normalizing the same expression twice produce the same id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::model::{BOTTOM, LiteralKind, TOP};

use super::restriction::Restriction;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, concat!(stringify!($name), " space exhausted"));
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

dense_id!(
    /// Id of a named or synthetic concept; doubles as the saturation context id.
    ConceptId,
    "c"
);
dense_id!(
    /// Id of a named or synthetic role.
    RoleId,
    "r"
);
dense_id!(
    /// Id of a feature.
    FeatureId,
    "f"
);
dense_id!(
    /// Id of an interned datatype restriction.
    DatatypeId,
    "d"
);

impl ConceptId {
    pub const TOP: ConceptId = ConceptId(0);
    pub const BOTTOM: ConceptId = ConceptId(1);
}

/// What a concept id stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptOrigin {
    Named(Arc<str>),
    /// Binary conjunction, operands ordered by id.
    Conjunction(ConceptId, ConceptId),
    Existential(RoleId, ConceptId),
    Datatype(DatatypeId),
}

/// What a role id stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleOrigin {
    Named(Arc<str>),
    /// Synthetic role standing for the composition of two roles.
    Chain(RoleId, RoleId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: Arc<str>,
    pub kind: LiteralKind,
}

/// Session-wide id tables. Ids are never reused or renumbered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interner {
    concepts: Vec<ConceptOrigin>,
    named: HashMap<Arc<str>, ConceptId>,
    synthetic: HashMap<ConceptOrigin, ConceptId>,
    roles: Vec<RoleOrigin>,
    role_names: HashMap<Arc<str>, RoleId>,
    chains: HashMap<(RoleId, RoleId), RoleId>,
    features: Vec<FeatureInfo>,
    feature_names: HashMap<Arc<str>, FeatureId>,
    restrictions: Vec<Restriction>,
    restriction_ids: HashMap<Restriction, DatatypeId>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        let mut interner = Self {
            concepts: Vec::new(),
            named: HashMap::new(),
            synthetic: HashMap::new(),
            roles: Vec::new(),
            role_names: HashMap::new(),
            chains: HashMap::new(),
            features: Vec::new(),
            feature_names: HashMap::new(),
            restrictions: Vec::new(),
            restriction_ids: HashMap::new(),
        };
        let top = interner.push_named(Arc::from(TOP));
        let bottom = interner.push_named(Arc::from(BOTTOM));
        debug_assert_eq!(top, ConceptId::TOP);
        debug_assert_eq!(bottom, ConceptId::BOTTOM);
        interner
    }

    fn push_named(&mut self, name: Arc<str>) -> ConceptId {
        let id = ConceptId::from_index(self.concepts.len());
        self.concepts.push(ConceptOrigin::Named(name.clone()));
        self.named.insert(name, id);
        id
    }

    fn push_synthetic(&mut self, origin: ConceptOrigin) -> ConceptId {
        if let Some(&id) = self.synthetic.get(&origin) {
            return id;
        }
        let id = ConceptId::from_index(self.concepts.len());
        self.concepts.push(origin.clone());
        self.synthetic.insert(origin, id);
        id
    }

    // -----------------------------------------------------------------------
    // Interning
    // -----------------------------------------------------------------------

    /// Id of a named concept, allocating it on first sight.
    pub fn concept(&mut self, name: &Arc<str>) -> Result<ConceptId, IndexError> {
        if name.is_empty() {
            return Err(IndexError::EmptyName { what: "concept" });
        }
        if let Some(&id) = self.named.get(name) {
            return Ok(id);
        }
        Ok(self.push_named(name.clone()))
    }

    pub fn conjunction(&mut self, a: ConceptId, b: ConceptId) -> ConceptId {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        self.push_synthetic(ConceptOrigin::Conjunction(left, right))
    }

    pub fn existential(&mut self, role: RoleId, filler: ConceptId) -> ConceptId {
        self.push_synthetic(ConceptOrigin::Existential(role, filler))
    }

    pub fn datatype_concept(&mut self, datatype: DatatypeId) -> ConceptId {
        self.push_synthetic(ConceptOrigin::Datatype(datatype))
    }

    /// Id of a named role. Role names may not collide with features or the
    /// reserved concept names.
    pub fn role(&mut self, name: &Arc<str>) -> Result<RoleId, IndexError> {
        if name.is_empty() {
            return Err(IndexError::EmptyName { what: "role" });
        }
        if let Some(&id) = self.role_names.get(name) {
            return Ok(id);
        }
        if self.feature_names.contains_key(name) {
            return Err(conflict(name, "feature", "role"));
        }
        reject_reserved(name, "role")?;
        let id = RoleId::from_index(self.roles.len());
        self.roles.push(RoleOrigin::Named(name.clone()));
        self.role_names.insert(name.clone(), id);
        Ok(id)
    }

    /// Synthetic role standing for `first ∘ second`.
    pub fn chain_role(&mut self, first: RoleId, second: RoleId) -> RoleId {
        if let Some(&id) = self.chains.get(&(first, second)) {
            return id;
        }
        let id = RoleId::from_index(self.roles.len());
        self.roles.push(RoleOrigin::Chain(first, second));
        self.chains.insert((first, second), id);
        id
    }

    /// Id of a feature, typed by the literal kind of its first use.
    pub fn feature(&mut self, name: &Arc<str>, kind: LiteralKind) -> Result<FeatureId, IndexError> {
        if name.is_empty() {
            return Err(IndexError::EmptyName { what: "feature" });
        }
        if let Some(&id) = self.feature_names.get(name) {
            let expected = self.features[id.index()].kind;
            if expected != kind {
                return Err(IndexError::FeatureTypeMismatch {
                    feature: name.to_string(),
                    expected: expected.to_string(),
                    found: kind.to_string(),
                });
            }
            return Ok(id);
        }
        if self.role_names.contains_key(name) {
            return Err(conflict(name, "role", "feature"));
        }
        reject_reserved(name, "feature")?;
        let id = FeatureId::from_index(self.features.len());
        self.features.push(FeatureInfo {
            name: name.clone(),
            kind,
        });
        self.feature_names.insert(name.clone(), id);
        Ok(id)
    }

    pub fn restriction(&mut self, restriction: Restriction) -> DatatypeId {
        if let Some(&id) = self.restriction_ids.get(&restriction) {
            return id;
        }
        let id = DatatypeId::from_index(self.restrictions.len());
        self.restrictions.push(restriction.clone());
        self.restriction_ids.insert(restriction, id);
        id
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn concept_id(&self, name: &str) -> Option<ConceptId> {
        self.named.get(name).copied()
    }

    pub fn role_id(&self, name: &str) -> Option<RoleId> {
        self.role_names.get(name).copied()
    }

    /// The identifier of a named concept, `None` for synthetic ids.
    pub fn concept_name(&self, id: ConceptId) -> Option<&Arc<str>> {
        match self.concepts.get(id.index()) {
            Some(ConceptOrigin::Named(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_named(&self, id: ConceptId) -> bool {
        self.concept_name(id).is_some()
    }

    pub fn restriction_of(&self, id: DatatypeId) -> Option<&Restriction> {
        self.restrictions.get(id.index())
    }

    /// All named concepts, including top and bottom, in id order.
    pub fn named_concepts(&self) -> impl Iterator<Item = (ConceptId, &Arc<str>)> + '_ {
        self.concepts
            .iter()
            .enumerate()
            .filter_map(|(i, origin)| match origin {
                ConceptOrigin::Named(name) => Some((ConceptId::from_index(i), name)),
                _ => None,
            })
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }
}

fn conflict(name: &str, existing: &'static str, requested: &'static str) -> IndexError {
    IndexError::NameConflict {
        name: name.to_string(),
        existing,
        requested,
    }
}

fn reject_reserved(name: &str, requested: &'static str) -> Result<(), IndexError> {
    if name == TOP || name == BOTTOM {
        return Err(conflict(name, "reserved concept", requested));
    }
    Ok(())
}
