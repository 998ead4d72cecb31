//! Rich diagnostic error types for the classification engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers can tell a rejected input
//! apart from a misuse of the reasoner lifecycle or a damaged snapshot.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the reasoner.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller. None of these errors leaves a [`Reasoner`]
/// unusable: a failed operation reports the error and keeps the prior state.
///
/// [`Reasoner`]: crate::reasoner::Reasoner
#[derive(Debug, Error, Diagnostic)]
pub enum ElError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Saturation(#[from] SaturationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("cannot compare {left} literal with {right} literal")]
    #[diagnostic(
        code(el::model::type_mismatch),
        help(
            "Literals are only ordered within one type. \
             Use the same literal type for every restriction on a feature."
        )
    )]
    TypeMismatch { left: String, right: String },

    #[error("invalid literal: {message}")]
    #[diagnostic(
        code(el::model::invalid_literal),
        help("Floating point literals must be numbers; NaN cannot be compared.")
    )]
    InvalidLiteral { message: String },
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("conjunction has no operands")]
    #[diagnostic(
        code(el::index::empty_conjunction),
        help("Build conjunctions from at least one concept, or use the top concept.")
    )]
    EmptyConjunction,

    #[error("role inclusion has an empty left-hand chain")]
    #[diagnostic(
        code(el::index::empty_role_chain),
        help("A role inclusion needs at least one role on its left-hand side.")
    )]
    EmptyRoleChain,

    #[error("{what} name is empty")]
    #[diagnostic(
        code(el::index::empty_name),
        help("Every concept, role and feature needs a non-empty identifier.")
    )]
    EmptyName { what: &'static str },

    #[error("name \"{name}\" is already used as a {existing}, cannot use it as a {requested}")]
    #[diagnostic(
        code(el::index::name_conflict),
        help(
            "Roles, features and the reserved top/bottom concepts live in one \
             namespace. Rename one of the uses."
        )
    )]
    NameConflict {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("feature \"{feature}\" is typed {expected} but a restriction uses {found}")]
    #[diagnostic(
        code(el::index::feature_type),
        help("All restrictions on one feature must use literals of the same type.")
    )]
    FeatureTypeMismatch {
        feature: String,
        expected: String,
        found: String,
    },

    #[error("operator {operator} is not supported for {kind} feature \"{feature}\"")]
    #[diagnostic(
        code(el::index::unsupported_operator),
        help("Boolean features only support equality restrictions.")
    )]
    UnsupportedOperator {
        feature: String,
        operator: String,
        kind: String,
    },

    #[error("model error: {0}")]
    #[diagnostic(code(el::index::model))]
    Model(#[from] ModelError),
}

// ---------------------------------------------------------------------------
// Saturation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SaturationError {
    #[error("saturation cancelled after {processed} derivation steps")]
    #[diagnostic(
        code(el::saturation::cancelled),
        help(
            "The cancellation token was triggered. The previous classification \
             is still in place; call classify again to retry."
        )
    )]
    Cancelled { processed: u64 },

    #[error("failed to start saturation workers: {message}")]
    #[diagnostic(
        code(el::saturation::worker_pool),
        help("Lower `worker_threads` in the reasoner configuration, or set it to 1.")
    )]
    WorkerPool { message: String },
}

// ---------------------------------------------------------------------------
// Taxonomy errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TaxonomyError {
    #[error("taxonomy validation failed: {message}")]
    #[diagnostic(
        code(el::taxonomy::invalid),
        help(
            "The built taxonomy violates a structural invariant. \
             This indicates an internal defect; please report it with the input ontology."
        )
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Lifecycle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    #[error("cannot {operation}: no axioms have been loaded")]
    #[diagnostic(
        code(el::state::not_loaded),
        help("Call `load_axioms` or `load_ontology` first.")
    )]
    NotLoaded { operation: &'static str },

    #[error("cannot {operation}: the ontology has not been classified")]
    #[diagnostic(
        code(el::state::not_classified),
        help("Call `classify` after loading axioms, then query the result.")
    )]
    NotClassified { operation: &'static str },

    #[error("cannot {operation} while the reasoner is {state}")]
    #[diagnostic(
        code(el::state::illegal),
        help(
            "A pruned reasoner only answers taxonomy queries and can be saved. \
             Create a new reasoner to classify further changes."
        )
    )]
    IllegalState {
        operation: &'static str,
        state: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("concept not found: {concept}")]
    #[diagnostic(
        code(el::query::concept_not_found),
        help("The concept never appeared in a loaded axiom. Check the identifier.")
    )]
    ConceptNotFound { concept: String },

    #[error("role not found: {role}")]
    #[diagnostic(
        code(el::query::role_not_found),
        help("The role never appeared in a loaded axiom. Check the identifier.")
    )]
    RoleNotFound { role: String },
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PersistError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(el::persist::io),
        help("Check that the snapshot location is readable and writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("not a reasoner snapshot (bad magic bytes)")]
    #[diagnostic(
        code(el::persist::bad_magic),
        help("The stream does not start with a saved reasoner. Check the file path.")
    )]
    BadMagic,

    #[error("unsupported snapshot format version {found} (expected {expected})")]
    #[diagnostic(
        code(el::persist::version),
        help("The snapshot was written by an incompatible release. Re-classify and save again.")
    )]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("corrupt snapshot: {message}")]
    #[diagnostic(
        code(el::persist::corrupt),
        help("The snapshot is truncated or damaged. The live reasoner was left untouched.")
    )]
    Corrupt { message: String },

    #[error("failed to encode snapshot: {message}")]
    #[diagnostic(code(el::persist::encode))]
    Encode { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    #[diagnostic(
        code(el::config::io),
        help("Ensure the configuration file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {message}")]
    #[diagnostic(
        code(el::config::parse),
        help("The configuration must be valid TOML matching ReasonerConfig's fields.")
    )]
    Parse { message: String },

    #[error("invalid config: {message}")]
    #[diagnostic(code(el::config::invalid), help("Check the ReasonerConfig fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning reasoner results.
pub type ElResult<T> = std::result::Result<T, ElError>;
