//! A named, versioned set of stated axioms.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Axiom;

/// The stated side of an ontology: identity plus the axioms as loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    id: String,
    version: String,
    axioms: BTreeSet<Axiom>,
}

impl Ontology {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            axioms: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns `true` if the axiom was not already present.
    pub fn add_axiom(&mut self, axiom: Axiom) -> bool {
        self.axioms.insert(axiom)
    }

    pub fn axioms(&self) -> &BTreeSet<Axiom> {
        &self.axioms
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    pub(crate) fn set_identity(&mut self, id: &str, version: &str) {
        self.id = id.to_string();
        self.version = version.to_string();
    }

    pub(crate) fn replace_axioms(&mut self, axioms: impl IntoIterator<Item = Axiom>) {
        self.axioms = axioms.into_iter().collect();
    }
}

impl Extend<Axiom> for Ontology {
    fn extend<T: IntoIterator<Item = Axiom>>(&mut self, iter: T) {
        self.axioms.extend(iter);
    }
}
