//! Multi-step wizard engine
//!
//! A [`WizardDefinition`] declares fields (with rules and visibility predicates)
//! and the ordered steps that own them. A [`WizardSession`] walks one user through
//! it:
//!
//! 1. `set_value` stores a value and recomputes which fields and steps apply
//! 2. only applicable fields are validated
//! 3. the step gate lets `next` leave a step once its applicable fields are valid
//! 4. leaving the last step yields a [`SubmissionRequest`] for the API client
//!
//! ```
//! use std::sync::Arc;
//! use clusterwiz::wizard::{
//!     FieldDefinition, FieldKind, RemoteLookups, StepDefinition, SubmitMethod,
//!     WizardDefinition, WizardSession, Advance,
//! };
//! use serde_json::json;
//!
//! let definition = WizardDefinition::builder("greeting", "Say hello")
//!     .field(FieldDefinition::new("name", "Name", FieldKind::Text).required())
//!     .step(StepDefinition::new("who", "Who").with_fields(["name"]))
//!     .submit_to(SubmitMethod::Post, |_| "/greetings".into())
//!     .build()
//!     .unwrap();
//!
//! let mut session = WizardSession::new("s1", Arc::new(definition), RemoteLookups::new()).unwrap();
//! assert!(!session.can_advance());
//! session.set_value("name", json!("world")).unwrap();
//! assert!(matches!(session.next(), Ok(Advance::Submit(_))));
//! ```

mod condition;
mod definition;
mod error;
mod field;
mod gate;
mod lookups;
mod registry;
mod resolver;
mod rule;
mod session;
mod validator;
mod values;

pub use condition::{Condition, PredicateFn};
pub use definition::{
    Applicability, EndpointFn, LookupSource, PayloadFn, StepDefinition, SubmitMethod, SubmitTarget,
    WizardBuilder, WizardDefinition,
};
pub use error::{DefinitionError, PredicateEvaluationError, Subject, SubmissionError, WizardError};
pub use field::{FieldDefinition, FieldKind, SelectOption, SelectOptions};
pub use gate::{blocking_fields, can_advance};
pub use lookups::RemoteLookups;
pub use registry::FieldRegistry;
pub use resolver::{compute_applicable_fields, compute_applicable_steps, Resolution};
pub use rule::{FieldContext, Rule, RuleFn};
pub use session::{
    Advance, SessionState, SubmissionOutcome, SubmissionRequest, SubmittedResource, WizardSession,
};
pub use validator::{validate, ValidationResult};
pub use values::{is_present, FieldValue, FormValues};
