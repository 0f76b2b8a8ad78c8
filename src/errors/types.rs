use thiserror::Error;

use crate::models::Kind;

/// Errors produced by the consolidation engine.
///
/// `MalformedTarget` and `NotADomain` are contract violations: they indicate
/// a bug in an upstream adapter and are propagated to the operator instead of
/// being swallowed. Registration-time variants surface configuration problems
/// before a run starts. External degradations (failed resolution, missing
/// custom definitions) are absorbed where they occur and never reach this
/// enum.
#[derive(Debug, Error)]
pub enum CoalesceError {
    #[error("Malformed target {target:?}: {reason}")]
    MalformedTarget { target: String, reason: String },

    #[error("{0:?} does not look like a domain (contains a port separator?)")]
    NotADomain(String),

    #[error("Kind {0} appears in data but is not declared by any registered adapter")]
    UnregisteredKind(Kind),

    #[error("Kind {kind} is declared by both {first} and {second}")]
    DuplicateKind {
        kind: Kind,
        first: &'static str,
        second: &'static str,
    },

    #[error("Adapter {adapter} supplies a rule for kind {kind} it does not declare")]
    RuleForUndeclaredKind { adapter: &'static str, kind: Kind },

    #[error("Adapter {adapter} declares kind {kind} without a severity")]
    MissingSeverity { adapter: &'static str, kind: Kind },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
