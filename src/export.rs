//! Export types for serializing a classification.
//!
//! These types give a flat, identifier-resolved view of a taxonomy that is
//! convenient to hand to other tools as JSON.

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::reasoner::ClassifiedOntology;

/// Exported taxonomy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExport {
    /// Node id.
    pub id: u32,
    /// Equivalent concept identifiers, canonical first.
    pub concepts: Vec<String>,
    /// Direct parent node ids.
    pub parents: Vec<u32>,
    /// Direct child node ids.
    pub children: Vec<u32>,
    /// Whether the node changed in the last incremental classification.
    pub affected: bool,
}

/// Exported classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyExport {
    pub ontology_id: String,
    pub ontology_version: String,
    /// Id of the top node.
    pub top: u32,
    /// Id of the bottom node.
    pub bottom: u32,
    pub nodes: Vec<NodeExport>,
}

impl TaxonomyExport {
    pub fn from_classified(classified: &ClassifiedOntology<'_>) -> Self {
        let taxonomy = classified.taxonomy();
        let affected = classified.affected_node_ids();
        let nodes = taxonomy
            .nodes()
            .map(|node| NodeExport {
                id: node.id().get(),
                concepts: node.concepts().map(str::to_string).collect(),
                parents: node.parents().iter().map(|p| p.get()).collect(),
                children: node.children().iter().map(|c| c.get()).collect(),
                affected: affected.contains(&node.id()),
            })
            .collect();
        Self {
            ontology_id: classified.id().to_string(),
            ontology_version: classified.version().to_string(),
            top: taxonomy.top().id().get(),
            bottom: taxonomy.bottom().id().get(),
            nodes,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistError::Encode {
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        serde_json::from_str(json).map_err(|e| PersistError::Corrupt {
            message: e.to_string(),
        })
    }
}
