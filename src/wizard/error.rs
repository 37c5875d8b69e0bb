//! Error types for the wizard engine
use std::fmt;

use thiserror::Error;

/// Programmer errors found while assembling a wizard definition.
///
/// These are raised once at startup; a catalogue that fails to build is a defect,
/// not a user-facing condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("field `{0}` is registered twice")]
    DuplicateField(String),

    #[error("step `{0}` is declared twice")]
    DuplicateStep(String),

    /// A step, predicate or rule names a field the registry does not know.
    #[error("`{owner}` references unknown field `{key}`")]
    UnknownField { owner: String, key: String },

    #[error("field `{key}` is owned by both `{first}` and `{second}`")]
    FieldOwnedTwice {
        key: String,
        first: String,
        second: String,
    },

    #[error("wizard `{0}` declares no steps")]
    NoSteps(String),

    #[error("wizard `{0}` has no submission target")]
    NoSubmitTarget(String),
}

/// What a failing predicate was attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Field(String),
    Step(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Field(key) => write!(f, "field `{}`", key),
            Subject::Step(id) => write!(f, "step `{}`", id),
        }
    }
}

/// A visibility predicate could not be evaluated against the current values.
///
/// The resolver recovers by treating the subject as not applicable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("predicate for {subject} failed: {message}")]
pub struct PredicateEvaluationError {
    pub subject: Subject,
    pub message: String,
}

/// The remote API refused or failed the final submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmissionError {
    /// HTTP status, when the failure came from a response rather than the transport.
    pub status: Option<u16>,
    pub message: String,
}

impl SubmissionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// A controller operation was rejected. The session state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("unknown step `{0}`")]
    UnknownStep(String),

    #[error("step `{0}` does not apply to the current values")]
    StepNotApplicable(String),

    /// `goto` targeted a step past the furthest one reached through validation.
    #[error("step `{0}` has not been reached yet")]
    StepLocked(String),

    #[error("step `{step}` has errors in: {}", fields.join(", "))]
    Blocked { step: String, fields: Vec<String> },

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("the wizard session is closed")]
    SessionClosed,

    #[error("no step of wizard `{0}` applies to the current values")]
    NoApplicableStep(String),
}
