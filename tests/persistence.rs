//! Save and restore tests for the reasoner.
//!
//! These tests verify that every lifecycle state survives a save/restore
//! cycle and that a damaged snapshot never replaces a live reasoner.

use std::fs;

use el_reasoner::config::ReasonerConfig;
use el_reasoner::error::{ElError, PersistError, StateError};
use el_reasoner::model::{Axiom, Concept, Feature, Ontology, Operator, Role};
use el_reasoner::reasoner::{LoadMode, Reasoner, ReasonerState};

fn config() -> ReasonerConfig {
    ReasonerConfig {
        worker_threads: 1,
        validate_taxonomy: true,
        ..Default::default()
    }
}

fn sub(a: &str, b: &str) -> Axiom {
    Axiom::concept_inclusion(Concept::named(a), Concept::named(b))
}

fn ontology() -> Ontology {
    let mut ontology = Ontology::new("http://example.org/anatomy", "1.0");
    ontology.extend([
        sub("Femur", "Bone"),
        sub("Fracture", "Disorder"),
        Axiom::concept_inclusion(
            Concept::named("Femur-fracture"),
            Concept::conjunction([
                Concept::named("Fracture"),
                Concept::existential(Role::new("site"), Concept::named("Femur")),
            ]),
        ),
        Axiom::concept_inclusion(
            Concept::named("Adult"),
            Concept::datatype(Feature::new("age"), Operator::GreaterThanEquals, 18),
        ),
    ]);
    ontology
}

fn classified() -> Reasoner {
    let mut reasoner = Reasoner::new(config()).unwrap();
    reasoner.load_ontology(&ontology(), LoadMode::Merge).unwrap();
    reasoner.classify().unwrap();
    reasoner
}

fn roundtrip(reasoner: &Reasoner) -> Reasoner {
    let mut buffer = Vec::new();
    reasoner.save(&mut buffer).unwrap();
    Reasoner::restore(buffer.as_slice(), config()).unwrap()
}

#[test]
fn classified_state_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("anatomy.elrs");

    let before = {
        let reasoner = classified();
        reasoner.save_to_path(&path).unwrap();
        reasoner.taxonomy().unwrap()
    };

    let restored = Reasoner::restore_from_path(&path, config()).unwrap();
    assert_eq!(restored.state(), ReasonerState::Classified);
    let after = restored.taxonomy().unwrap();
    assert!(after.same_structure(&before));
    assert_eq!(
        after.node("Femur").unwrap().id(),
        before.node("Femur").unwrap().id()
    );
    assert!(restored.subsumes("Femur-fracture", "Disorder").unwrap());
    assert!(
        restored
            .has_existential("Femur-fracture", "site", "Bone")
            .unwrap()
    );

    let classified = restored.classified_ontology().unwrap();
    assert_eq!(classified.id(), "http://example.org/anatomy");
    assert_eq!(classified.version(), "1.0");
    assert_eq!(classified.stated_axioms(), ontology().axioms());
}

#[test]
fn restored_reasoner_classifies_incrementally() {
    let mut restored = roundtrip(&classified());
    restored
        .load_axioms([sub("Bone", "Anatomical-structure")], LoadMode::Merge)
        .unwrap();
    restored.classify().unwrap();
    assert!(restored.subsumes("Femur", "Anatomical-structure").unwrap());
    let classified = restored.classified_ontology().unwrap();
    assert!(!classified.affected_node_ids().is_empty());
}

#[test]
fn loaded_state_keeps_previous_classification() {
    let mut reasoner = classified();
    reasoner
        .load_axioms([sub("Disorder", "Clinical-finding")], LoadMode::Merge)
        .unwrap();
    let mut restored = roundtrip(&reasoner);
    assert_eq!(restored.state(), ReasonerState::Loaded);
    restored.classify().unwrap();
    assert!(restored.subsumes("Fracture", "Clinical-finding").unwrap());
}

#[test]
fn pruned_and_empty_states_roundtrip() {
    let mut reasoner = classified();
    reasoner.prune();
    let restored = roundtrip(&reasoner);
    assert_eq!(restored.state(), ReasonerState::Pruned);
    assert!(
        restored
            .taxonomy()
            .unwrap()
            .is_subsumed_by("Femur-fracture", "Fracture")
            .unwrap()
    );

    let empty = roundtrip(&Reasoner::new(config()).unwrap());
    assert_eq!(empty.state(), ReasonerState::Empty);
    assert!(matches!(
        empty.taxonomy(),
        Err(ElError::State(StateError::NotClassified { .. }))
    ));
}

#[test]
fn damaged_snapshot_leaves_reasoner_untouched() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("damaged.elrs");
    classified().save_to_path(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let mut live = Reasoner::new(config()).unwrap();
    live.load_axioms([sub("A", "B")], LoadMode::Merge).unwrap();
    live.classify().unwrap();
    let before = live.taxonomy().unwrap();

    let err = live.restore_from(fs::File::open(&path).unwrap()).unwrap_err();
    assert!(matches!(err, ElError::Persist(PersistError::Corrupt { .. })));
    assert_eq!(live.state(), ReasonerState::Classified);
    assert!(std::sync::Arc::ptr_eq(&before, &live.taxonomy().unwrap()));
}

#[test]
fn foreign_files_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "Femur is a bone").unwrap();
    assert!(matches!(
        Reasoner::restore_from_path(&path, config()),
        Err(ElError::Persist(PersistError::BadMagic))
    ));
    assert!(matches!(
        Reasoner::restore_from_path(&dir.path().join("missing"), config()),
        Err(ElError::Persist(PersistError::Io { .. }))
    ));
}
