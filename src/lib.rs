// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # el-reasoner
//!
//! A classification engine for the EL family of description logics, aimed
//! at large clinical terminologies.
//!
//! ## Architecture
//!
//! - **Model** (`model`): concepts, roles, datatype restrictions and axioms
//! - **Axiom index** (`index`): normalization into a small set of rule shapes
//! - **Saturation** (`saturation`): parallel completion-rule engine over per-concept contexts
//! - **Taxonomy** (`taxonomy`): equivalence classes and the direct-subsumption DAG
//! - **Incremental** (`incremental`): re-classification of only the affected part after a change
//! - **Reasoner** (`reasoner`): the load / classify / prune lifecycle, queries and snapshots
//!
//! ## Library usage
//!
//! ```no_run
//! use el_reasoner::config::ReasonerConfig;
//! use el_reasoner::model::{Axiom, Concept, Role};
//! use el_reasoner::reasoner::{LoadMode, Reasoner};
//!
//! let mut reasoner = Reasoner::new(ReasonerConfig::default()).unwrap();
//! reasoner
//!     .load_axioms(
//!         [
//!             Axiom::concept_inclusion(Concept::named("Femur"), Concept::named("Bone")),
//!             Axiom::concept_inclusion(
//!                 Concept::named("Femur-fracture"),
//!                 Concept::existential(Role::new("site"), Concept::named("Femur")),
//!             ),
//!         ],
//!         LoadMode::Merge,
//!     )
//!     .unwrap();
//! reasoner.classify().unwrap();
//! let taxonomy = reasoner.taxonomy().unwrap();
//! assert!(taxonomy.is_subsumed_by("Femur", "Bone").unwrap());
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod incremental;
pub mod index;
pub mod model;
mod persist;
pub mod reasoner;
pub mod saturation;
pub mod taxonomy;

pub use error::{ElError, ElResult};
pub use reasoner::{LoadMode, Reasoner, ReasonerState};
