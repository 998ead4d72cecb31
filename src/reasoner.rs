//! Reasoner facade: the public lifecycle for loading, classifying and
//! querying an ontology.
//!
//! The reasoner moves through four states:
//!
//! ```text
//! Empty ──load──▶ Loaded ──classify──▶ Classified ──prune──▶ Pruned
//!                   ▲                       │
//!                   └─────────load──────────┘
//! ```
//!
//! Every operation either completes or leaves the reasoner exactly as it
//! was. Loading works on copies of the stated ontology and the interner and
//! commits only once the new axiom index has been built; classification
//! computes into fresh structures and swaps them in at the end.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::cancel::CancellationToken;
use crate::config::ReasonerConfig;
use crate::error::{ElError, ElResult, PersistError, QueryError, SaturationError, StateError};
use crate::incremental;
use crate::index::{AxiomIndex, ConceptId, Interner, RoleId};
use crate::model::{Axiom, BOTTOM, Concept, Ontology};
use crate::persist::{self, ClassificationRecord, PrunedRecord, SessionRecord, Snapshot};
use crate::saturation::Saturation;
use crate::taxonomy::{Node, NodeId, Taxonomy, TaxonomyBuilder};

/// How newly loaded axioms combine with the ones already stated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Add to the stated axioms.
    #[default]
    Merge,
    /// Replace the stated axioms. Concepts that disappear from the axioms
    /// stay known and are classified directly under top.
    Replace,
}

/// Lifecycle state of a [`Reasoner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonerState {
    Empty,
    Loaded,
    Classified,
    Pruned,
}

impl ReasonerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loaded => "loaded",
            Self::Classified => "classified",
            Self::Pruned => "pruned",
        }
    }
}

impl fmt::Display for ReasonerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary counts for a reasoner.
#[derive(Debug, Clone)]
pub struct ReasonerInfo {
    pub state: ReasonerState,
    pub ontology_id: String,
    pub ontology_version: String,
    pub stated_axioms: usize,
    pub normalized_rules: usize,
    pub concepts: usize,
    pub roles: usize,
    pub taxonomy_nodes: usize,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Classification {
    /// The index the saturation was computed from.
    index: Arc<AxiomIndex>,
    saturation: Saturation,
    taxonomy: Arc<Taxonomy>,
    affected: BTreeSet<NodeId>,
}

struct Session {
    ontology: Ontology,
    interner: Interner,
    index: Arc<AxiomIndex>,
    /// The most recent classification. Kept while `Loaded` so the next
    /// classify can run incrementally.
    classification: Option<Classification>,
}

struct PrunedState {
    ontology: Ontology,
    taxonomy: Arc<Taxonomy>,
    affected: BTreeSet<NodeId>,
}

enum Stage {
    Empty,
    Loaded(Session),
    Classified(Session),
    Pruned(PrunedState),
}

impl Stage {
    fn state(&self) -> ReasonerState {
        match self {
            Self::Empty => ReasonerState::Empty,
            Self::Loaded(_) => ReasonerState::Loaded,
            Self::Classified(_) => ReasonerState::Classified,
            Self::Pruned(_) => ReasonerState::Pruned,
        }
    }

    fn snapshot(&self) -> Snapshot<'_> {
        match self {
            Self::Empty => Snapshot::Empty,
            Self::Loaded(session) => Snapshot::Loaded(session.record()),
            Self::Classified(session) => Snapshot::Classified(session.record()),
            Self::Pruned(pruned) => Snapshot::Pruned(PrunedRecord {
                ontology: Cow::Borrowed(&pruned.ontology),
                taxonomy: Cow::Borrowed(&*pruned.taxonomy),
                affected: Cow::Borrowed(&pruned.affected),
            }),
        }
    }

    fn from_snapshot(snapshot: Snapshot<'static>) -> Result<Self, PersistError> {
        let stage = match snapshot {
            Snapshot::Empty => Self::Empty,
            Snapshot::Loaded(record) => Self::Loaded(Session::from_record(record)?),
            Snapshot::Classified(record) => {
                let session = Session::from_record(record)?;
                if session.classification.is_none() {
                    return Err(PersistError::Corrupt {
                        message: "classified snapshot has no classification".into(),
                    });
                }
                Self::Classified(session)
            }
            Snapshot::Pruned(record) => {
                let taxonomy = record.taxonomy.into_owned();
                check_taxonomy(&taxonomy)?;
                Self::Pruned(PrunedState {
                    ontology: record.ontology.into_owned(),
                    taxonomy: Arc::new(taxonomy),
                    affected: record.affected.into_owned(),
                })
            }
        };
        Ok(stage)
    }
}

impl Session {
    fn record(&self) -> SessionRecord<'_> {
        SessionRecord {
            ontology: Cow::Borrowed(&self.ontology),
            interner: Cow::Borrowed(&self.interner),
            index: Cow::Borrowed(&*self.index),
            classification: self.classification.as_ref().map(|c| ClassificationRecord {
                index: (!Arc::ptr_eq(&c.index, &self.index)).then(|| Cow::Borrowed(&*c.index)),
                saturation: Cow::Borrowed(&c.saturation),
                taxonomy: Cow::Borrowed(&*c.taxonomy),
                affected: Cow::Borrowed(&c.affected),
            }),
        }
    }

    fn from_record(record: SessionRecord<'static>) -> Result<Self, PersistError> {
        let interner = record.interner.into_owned();
        let index = Arc::new(record.index.into_owned());
        let corrupt = |message: &str| PersistError::Corrupt {
            message: message.to_string(),
        };
        if index.concept_count() > interner.concept_count() {
            return Err(corrupt("axiom index refers to unknown concepts"));
        }
        let classification = match record.classification {
            Some(c) => {
                let saturation = c.saturation.into_owned();
                let taxonomy = c.taxonomy.into_owned();
                let classified_index = match c.index {
                    Some(own) => Arc::new(own.into_owned()),
                    None => Arc::clone(&index),
                };
                if saturation.len() != classified_index.concept_count()
                    || saturation.len() > interner.concept_count()
                {
                    return Err(corrupt("saturation does not match the axiom index"));
                }
                check_taxonomy(&taxonomy)?;
                Some(Classification {
                    index: classified_index,
                    saturation,
                    taxonomy: Arc::new(taxonomy),
                    affected: c.affected.into_owned(),
                })
            }
            None => None,
        };
        Ok(Self {
            ontology: record.ontology.into_owned(),
            interner,
            index,
            classification,
        })
    }
}

fn check_taxonomy(taxonomy: &Taxonomy) -> Result<(), PersistError> {
    taxonomy.validate().map_err(|e| PersistError::Corrupt {
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Reasoner
// ---------------------------------------------------------------------------

/// An EL classification reasoner.
///
/// Mutating operations take `&mut self`; the classified taxonomy is shared
/// through an [`Arc`] so readers can keep using it while the owner loads
/// and classifies again.
pub struct Reasoner {
    config: ReasonerConfig,
    cancel: CancellationToken,
    stage: Stage,
}

impl Reasoner {
    /// Create an empty reasoner.
    pub fn new(config: ReasonerConfig) -> ElResult<Self> {
        config.validate()?;
        tracing::info!(
            workers = config.worker_threads,
            incremental = config.incremental,
            "initializing reasoner"
        );
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
            stage: Stage::Empty,
        })
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    pub fn state(&self) -> ReasonerState {
        self.stage.state()
    }

    /// Whether a classification result is available.
    pub fn is_classified(&self) -> bool {
        matches!(self.stage, Stage::Classified(_) | Stage::Pruned(_))
    }

    /// A handle that cancels a running [`classify`](Self::classify) from
    /// another thread. Only a request made while a run is in progress has
    /// any effect; the token is cleared when each run starts and after a
    /// cancelled run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Summary counts for logging and diagnostics.
    pub fn info(&self) -> ReasonerInfo {
        let mut info = ReasonerInfo {
            state: self.state(),
            ontology_id: String::new(),
            ontology_version: String::new(),
            stated_axioms: 0,
            normalized_rules: 0,
            concepts: 0,
            roles: 0,
            taxonomy_nodes: 0,
        };
        let (ontology, taxonomy) = match &self.stage {
            Stage::Empty => return info,
            Stage::Loaded(session) | Stage::Classified(session) => {
                info.normalized_rules = session.index.rule_count();
                info.concepts = session.interner.named_count();
                info.roles = session.interner.role_count();
                (
                    &session.ontology,
                    session.classification.as_ref().map(|c| &c.taxonomy),
                )
            }
            Stage::Pruned(pruned) => {
                info.concepts = pruned.taxonomy.concept_count();
                (&pruned.ontology, Some(&pruned.taxonomy))
            }
        };
        info.ontology_id = ontology.id().to_string();
        info.ontology_version = ontology.version().to_string();
        info.stated_axioms = ontology.len();
        info.taxonomy_nodes = taxonomy.map_or(0, |t| t.len());
        info
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load axioms. On error nothing changes.
    pub fn load_axioms(
        &mut self,
        axioms: impl IntoIterator<Item = Axiom>,
        mode: LoadMode,
    ) -> ElResult<()> {
        self.load(None, axioms.into_iter().collect(), mode)
    }

    /// Load an ontology's axioms and adopt its id and version.
    pub fn load_ontology(&mut self, ontology: &Ontology, mode: LoadMode) -> ElResult<()> {
        self.load(
            Some((ontology.id(), ontology.version())),
            ontology.axioms().iter().cloned().collect(),
            mode,
        )
    }

    fn load(
        &mut self,
        identity: Option<(&str, &str)>,
        axioms: Vec<Axiom>,
        mode: LoadMode,
    ) -> ElResult<()> {
        let (mut ontology, mut interner) = match &self.stage {
            Stage::Empty => (Ontology::default(), Interner::new()),
            Stage::Loaded(session) | Stage::Classified(session) => {
                (session.ontology.clone(), session.interner.clone())
            }
            Stage::Pruned(_) => {
                return Err(StateError::IllegalState {
                    operation: "load axioms",
                    state: "pruned",
                }
                .into());
            }
        };

        let offered = axioms.len();
        if let Some((id, version)) = identity {
            ontology.set_identity(id, version);
        }
        match mode {
            LoadMode::Merge => ontology.extend(axioms),
            LoadMode::Replace => ontology.replace_axioms(axioms),
        }
        let index = AxiomIndex::build(&mut interner, ontology.axioms())?;
        tracing::info!(
            offered,
            mode = ?mode,
            axioms = ontology.len(),
            rules = index.rule_count(),
            concepts = interner.named_count(),
            "axioms loaded"
        );

        let classification = match std::mem::replace(&mut self.stage, Stage::Empty) {
            Stage::Loaded(session) | Stage::Classified(session) => session.classification,
            _ => None,
        };
        self.stage = Stage::Loaded(Session {
            ontology,
            interner,
            index: Arc::new(index),
            classification,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Classify the loaded axioms.
    ///
    /// Runs incrementally when a previous classification exists and the
    /// configuration allows it. Calling this when already classified does
    /// nothing. A cancelled run returns [`SaturationError::Cancelled`] and
    /// keeps the previous state. A cancellation requested while no run was
    /// in progress is discarded when the next run starts.
    pub fn classify(&mut self) -> ElResult<()> {
        if self.cancel.is_cancelled() {
            tracing::debug!("discarding cancellation requested before classify");
            self.cancel.reset();
        }
        let result = self.run_classification();
        if let Err(ElError::Saturation(SaturationError::Cancelled { processed })) = &result {
            tracing::warn!(processed, "classification cancelled");
            self.cancel.reset();
        }
        result
    }

    fn run_classification(&mut self) -> ElResult<()> {
        let session = match &self.stage {
            Stage::Empty => return Err(StateError::NotLoaded { operation: "classify" }.into()),
            Stage::Pruned(_) => {
                return Err(StateError::IllegalState {
                    operation: "classify",
                    state: "pruned",
                }
                .into());
            }
            Stage::Classified(_) => {
                tracing::debug!("already classified");
                return Ok(());
            }
            Stage::Loaded(session) => session,
        };

        let started = Instant::now();
        let workers = self.config.worker_threads;
        let reuse = self.config.incremental && session.classification.is_some();
        let classification = match session.classification.as_ref().filter(|_| reuse) {
            Some(previous) => {
                let outcome = incremental::reclassify(
                    &session.interner,
                    &previous.saturation,
                    &previous.taxonomy,
                    &previous.index,
                    &session.index,
                    workers,
                    &self.cancel,
                )?;
                Classification {
                    index: Arc::clone(&session.index),
                    saturation: outcome.saturation,
                    taxonomy: Arc::new(outcome.taxonomy),
                    affected: outcome.affected_nodes,
                }
            }
            None => {
                let (saturation, _) = Saturation::compute(&session.index, workers, &self.cancel)?;
                let taxonomy = TaxonomyBuilder::new(&session.interner, &saturation).build();
                Classification {
                    index: Arc::clone(&session.index),
                    saturation,
                    taxonomy: Arc::new(taxonomy),
                    affected: BTreeSet::new(),
                }
            }
        };
        if self.config.validate_taxonomy {
            classification.taxonomy.validate()?;
        }
        tracing::info!(
            incremental = reuse,
            nodes = classification.taxonomy.len(),
            concepts = classification.taxonomy.concept_count(),
            affected = classification.affected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "classification complete"
        );

        self.stage = match std::mem::replace(&mut self.stage, Stage::Empty) {
            Stage::Loaded(mut session) => {
                session.classification = Some(classification);
                Stage::Classified(session)
            }
            other => other,
        };
        Ok(())
    }

    /// Discard everything but the taxonomy and the stated ontology.
    ///
    /// Only has an effect when classified. A pruned reasoner still answers
    /// taxonomy queries and can be saved, but cannot load or classify.
    pub fn prune(&mut self) {
        self.stage = match std::mem::replace(&mut self.stage, Stage::Empty) {
            Stage::Classified(Session {
                ontology,
                classification: Some(classification),
                ..
            }) => {
                tracing::info!(nodes = classification.taxonomy.len(), "reasoner pruned");
                Stage::Pruned(PrunedState {
                    ontology,
                    taxonomy: classification.taxonomy,
                    affected: classification.affected,
                })
            }
            other => {
                tracing::debug!(state = %other.state(), "prune has no effect");
                other
            }
        };
    }

    // -----------------------------------------------------------------------
    // Results
    // -----------------------------------------------------------------------

    /// The current taxonomy, shareable with other threads.
    pub fn taxonomy(&self) -> ElResult<Arc<Taxonomy>> {
        let (_, taxonomy, _) = self.result("read the taxonomy")?;
        Ok(Arc::clone(taxonomy))
    }

    /// The stated ontology together with its classification.
    pub fn classified_ontology(&self) -> ElResult<ClassifiedOntology<'_>> {
        let (ontology, taxonomy, affected) = self.result("read the classified ontology")?;
        Ok(ClassifiedOntology {
            ontology,
            taxonomy,
            affected,
        })
    }

    fn result(
        &self,
        operation: &'static str,
    ) -> ElResult<(&Ontology, &Arc<Taxonomy>, &BTreeSet<NodeId>)> {
        match &self.stage {
            Stage::Classified(Session {
                ontology,
                classification: Some(c),
                ..
            }) => Ok((ontology, &c.taxonomy, &c.affected)),
            Stage::Pruned(pruned) => Ok((&pruned.ontology, &pruned.taxonomy, &pruned.affected)),
            _ => Err(StateError::NotClassified { operation }.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Saturation queries
    // -----------------------------------------------------------------------

    /// `sub ⊑ sup` holds between two named concepts.
    pub fn subsumes(&self, sub: &str, sup: &str) -> ElResult<bool> {
        let (session, classification) = self.saturated("query subsumption")?;
        let sub = concept(&session.interner, sub)?;
        let sup = concept(&session.interner, sup)?;
        Ok(classification.saturation.subsumes(sub, sup))
    }

    pub fn is_satisfiable(&self, name: &str) -> ElResult<bool> {
        let (session, classification) = self.saturated("query satisfiability")?;
        let id = concept(&session.interner, name)?;
        Ok(classification.saturation.is_satisfiable(id))
    }

    /// `concept ⊑ ∃role.filler` holds.
    pub fn has_existential(&self, name: &str, role: &str, filler: &str) -> ElResult<bool> {
        let (session, classification) = self.saturated("query existentials")?;
        let id = concept(&session.interner, name)?;
        let role = role_id(&session.interner, role)?;
        let filler = concept(&session.interner, filler)?;
        Ok(classification
            .saturation
            .has_existential(id, role, filler, classification.index.roles()))
    }

    /// A role link (over `role` or one of its sub-roles) was derived from
    /// `from` to the context of `to`.
    pub fn has_link(&self, from: &str, role: &str, to: &str) -> ElResult<bool> {
        let (session, classification) = self.saturated("query links")?;
        let from = concept(&session.interner, from)?;
        let role = role_id(&session.interner, role)?;
        let to = concept(&session.interner, to)?;
        Ok(classification
            .saturation
            .has_link(from, role, to, classification.index.roles()))
    }

    fn saturated(&self, operation: &'static str) -> ElResult<(&Session, &Classification)> {
        match &self.stage {
            Stage::Classified(session) => match &session.classification {
                Some(c) => Ok((session, c)),
                None => Err(StateError::NotClassified { operation }.into()),
            },
            Stage::Empty | Stage::Loaded(_) => Err(StateError::NotClassified { operation }.into()),
            Stage::Pruned(_) => Err(StateError::IllegalState {
                operation,
                state: "pruned",
            }
            .into()),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the full reasoner state to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> ElResult<()> {
        persist::write_snapshot(writer, &self.stage.snapshot())?;
        tracing::info!(state = %self.state(), "reasoner saved");
        Ok(())
    }

    /// Create a reasoner from a snapshot written by [`save`](Self::save).
    pub fn restore<R: Read>(reader: R, config: ReasonerConfig) -> ElResult<Self> {
        let mut reasoner = Self::new(config)?;
        reasoner.restore_from(reader)?;
        Ok(reasoner)
    }

    /// Replace this reasoner's state with a snapshot. If the snapshot cannot
    /// be read the current state is kept.
    pub fn restore_from<R: Read>(&mut self, reader: R) -> ElResult<()> {
        let stage = Stage::from_snapshot(persist::read_snapshot(reader)?)?;
        self.stage = stage;
        tracing::info!(state = %self.state(), "reasoner restored");
        Ok(())
    }

    /// [`save`](Self::save) to a file, replacing it.
    pub fn save_to_path(&self, path: &Path) -> ElResult<()> {
        let file = File::create(path).map_err(|source| PersistError::Io { source })?;
        self.save(BufWriter::new(file))
    }

    /// [`restore`](Self::restore) from a file.
    pub fn restore_from_path(path: &Path, config: ReasonerConfig) -> ElResult<Self> {
        let file = File::open(path).map_err(|source| PersistError::Io { source })?;
        Self::restore(BufReader::new(file), config)
    }
}

fn concept(interner: &Interner, name: &str) -> Result<ConceptId, QueryError> {
    interner
        .concept_id(name)
        .ok_or_else(|| QueryError::ConceptNotFound {
            concept: name.to_string(),
        })
}

fn role_id(interner: &Interner, name: &str) -> Result<RoleId, QueryError> {
    interner.role_id(name).ok_or_else(|| QueryError::RoleNotFound {
        role: name.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Classified ontology
// ---------------------------------------------------------------------------

/// A read-only view of the stated ontology and its taxonomy.
pub struct ClassifiedOntology<'a> {
    ontology: &'a Ontology,
    taxonomy: &'a Taxonomy,
    affected: &'a BTreeSet<NodeId>,
}

impl<'a> ClassifiedOntology<'a> {
    pub fn id(&self) -> &'a str {
        self.ontology.id()
    }

    pub fn version(&self) -> &'a str {
        self.ontology.version()
    }

    pub fn stated_axioms(&self) -> &'a BTreeSet<Axiom> {
        self.ontology.axioms()
    }

    pub fn taxonomy(&self) -> &'a Taxonomy {
        self.taxonomy
    }

    pub fn node(&self, concept: &str) -> Result<&'a Node, QueryError> {
        self.taxonomy.node(concept)
    }

    pub fn top(&self) -> &'a Node {
        self.taxonomy.top()
    }

    pub fn bottom(&self) -> &'a Node {
        self.taxonomy.bottom()
    }

    /// Ids of the nodes whose equivalents or direct parents changed in the
    /// last incremental classification. Empty after a full classification.
    pub fn affected_node_ids(&self) -> &'a BTreeSet<NodeId> {
        self.affected
    }

    /// The nodes behind [`affected_node_ids`](Self::affected_node_ids).
    pub fn affected_nodes(&self) -> impl Iterator<Item = &'a Node> + 'a {
        let taxonomy = self.taxonomy;
        self.affected.iter().filter_map(|id| taxonomy.node_by_id(*id))
    }

    /// The taxonomy as axioms: one equivalence between each node's
    /// canonical concept and every other member, `C ⊑ ⊥` for unsatisfiable
    /// concepts, and `C ⊑ P` for every direct parent.
    pub fn inferred_axioms(&self) -> Vec<Axiom> {
        let taxonomy = self.taxonomy;
        let bottom = taxonomy.bottom().id();
        let mut axioms = Vec::new();
        for node in taxonomy.nodes() {
            if node.id() == bottom {
                axioms.extend(
                    node.concepts()
                        .filter(|c| *c != BOTTOM)
                        .map(|c| Axiom::concept_inclusion(Concept::named(c), Concept::bottom())),
                );
                continue;
            }
            let canonical = node.canonical();
            for other in node.concepts().skip(1) {
                axioms.extend(Axiom::equivalence(
                    Concept::named(canonical),
                    Concept::named(other),
                ));
            }
            for parent in taxonomy.parents(node) {
                axioms.push(Axiom::concept_inclusion(
                    Concept::named(canonical),
                    Concept::named(parent.canonical()),
                ));
            }
        }
        axioms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    fn sub(a: &str, b: &str) -> Axiom {
        Axiom::concept_inclusion(Concept::named(a), Concept::named(b))
    }

    fn reasoner() -> Reasoner {
        Reasoner::new(ReasonerConfig {
            worker_threads: 1,
            validate_taxonomy: true,
            ..ReasonerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn lifecycle_states() {
        let mut r = reasoner();
        assert_eq!(r.state(), ReasonerState::Empty);
        r.load_axioms([sub("A", "B")], LoadMode::Merge).unwrap();
        assert_eq!(r.state(), ReasonerState::Loaded);
        assert!(!r.is_classified());
        r.classify().unwrap();
        assert_eq!(r.state(), ReasonerState::Classified);
        r.prune();
        assert_eq!(r.state(), ReasonerState::Pruned);
        assert!(r.is_classified());
    }

    #[test]
    fn classify_before_load_is_rejected() {
        let mut r = reasoner();
        assert!(matches!(
            r.classify(),
            Err(ElError::State(StateError::NotLoaded { .. }))
        ));
    }

    #[test]
    fn prune_before_classify_has_no_effect() {
        let mut r = reasoner();
        r.prune();
        assert_eq!(r.state(), ReasonerState::Empty);
        r.load_axioms([sub("A", "B")], LoadMode::Merge).unwrap();
        r.prune();
        assert_eq!(r.state(), ReasonerState::Loaded);
    }

    #[test]
    fn queries_need_classification() {
        let mut r = reasoner();
        r.load_axioms([sub("A", "B")], LoadMode::Merge).unwrap();
        assert!(matches!(
            r.subsumes("A", "B"),
            Err(ElError::State(StateError::NotClassified { .. }))
        ));
        r.classify().unwrap();
        assert!(r.subsumes("A", "B").unwrap());
        assert!(!r.subsumes("B", "A").unwrap());
        assert!(matches!(
            r.subsumes("A", "Nope"),
            Err(ElError::Query(QueryError::ConceptNotFound { .. }))
        ));
    }

    #[test]
    fn inferred_axioms_cover_edges_and_equivalences() {
        let mut r = reasoner();
        r.load_axioms(
            Axiom::equivalence(Concept::named("A"), Concept::named("A2"))
                .into_iter()
                .chain([sub("B", "A")]),
            LoadMode::Merge,
        )
        .unwrap();
        r.classify().unwrap();
        let classified = r.classified_ontology().unwrap();
        let inferred = classified.inferred_axioms();
        assert!(inferred.contains(&sub("B", "A")));
        assert!(inferred.contains(&sub("A", "A2")));
        assert!(inferred.contains(&sub("A2", "A")));
        assert!(classified.affected_node_ids().is_empty());
    }

    #[test]
    fn info_reports_counts() {
        let mut r = reasoner();
        assert_eq!(r.info().stated_axioms, 0);
        r.load_axioms([sub("A", "B"), sub("B", "C")], LoadMode::Merge)
            .unwrap();
        r.classify().unwrap();
        let info = r.info();
        assert_eq!(info.state, ReasonerState::Classified);
        assert_eq!(info.stated_axioms, 2);
        assert_eq!(info.taxonomy_nodes, 5);
    }
}
