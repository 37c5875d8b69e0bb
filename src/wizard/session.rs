//! Wizard controller: one live session of a wizard
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::definition::{Applicability, StepDefinition, SubmitMethod, WizardDefinition};
use super::error::{PredicateEvaluationError, SubmissionError, WizardError};
use super::field::FieldDefinition;
use super::gate::{blocking_fields, can_advance};
use super::lookups::RemoteLookups;
use super::validator::ValidationResult;
use super::values::{FieldValue, FormValues};

/// What the API returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedResource {
    pub id: Option<String>,
    pub href: Option<String>,
    pub body: Value,
}

impl SubmittedResource {
    pub fn from_body(body: Value) -> Self {
        let id = body.get("id").and_then(Value::as_str).map(str::to_string);
        let href = body.get("href").and_then(Value::as_str).map(str::to_string);
        Self { id, href, body }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Editing { step: String },
    /// One request is in flight, identified by `ticket`.
    Submitting { ticket: u64, step: String },
    Submitted { resource: SubmittedResource },
    Cancelled,
}

/// A request the caller must send to the API, then report back through
/// [`WizardSession::complete_submission`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub ticket: u64,
    pub method: SubmitMethod,
    pub endpoint: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { to: String },
    Submit(SubmissionRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    /// The API failed the request; the session is back on its last step.
    Rejected,
    /// The response did not belong to the in-flight submission of a live session.
    Ignored,
}

/// Flow through a wizard for one user.
///
/// All operations are synchronous and leave the session consistent: values,
/// applicability and validation are recomputed together on every change.
#[derive(Debug, Clone)]
pub struct WizardSession {
    id: String,
    definition: Arc<WizardDefinition>,
    values: FormValues,
    lookups: RemoteLookups,
    applicability: Applicability,
    validation: ValidationResult,
    state: SessionState,
    /// Declaration index of the furthest step reached by validated navigation.
    furthest: usize,
    next_ticket: u64,
    submission_error: Option<SubmissionError>,
    created_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(
        id: impl Into<String>,
        definition: Arc<WizardDefinition>,
        lookups: RemoteLookups,
    ) -> Result<Self, WizardError> {
        let values = definition.default_values();
        let (applicability, validation) = definition.validate(&values, &lookups);
        let first = applicability
            .steps
            .first()
            .cloned()
            .ok_or_else(|| WizardError::NoApplicableStep(definition.name().to_string()))?;
        let furthest = definition.step_index(&first).unwrap_or(0);
        let id = id.into();
        tracing::debug!(session = %id, wizard = definition.name(), step = %first, "Wizard session opened");
        Ok(Self {
            id,
            definition,
            values,
            lookups,
            applicability,
            validation,
            state: SessionState::Editing { step: first },
            furthest,
            next_ticket: 1,
            submission_error: None,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn definition(&self) -> &Arc<WizardDefinition> {
        &self.definition
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn lookups(&self) -> &RemoteLookups {
        &self.lookups
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn diagnostics(&self) -> &[PredicateEvaluationError] {
        &self.applicability.diagnostics
    }

    pub fn submission_error(&self) -> Option<&SubmissionError> {
        self.submission_error.as_ref()
    }

    /// Editing or submitting; a submitted or cancelled session is finished.
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Editing { .. } | SessionState::Submitting { .. })
    }

    /// The step on screen, while editing or submitting.
    pub fn current_step(&self) -> Option<&StepDefinition> {
        match &self.state {
            SessionState::Editing { step } | SessionState::Submitting { step, .. } => self.definition.step(step),
            _ => None,
        }
    }

    pub fn applicable_steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.applicability
            .steps
            .iter()
            .filter_map(|id| self.definition.step(id))
    }

    pub fn is_field_applicable(&self, key: &str) -> bool {
        self.applicability.is_field_applicable(key)
    }

    pub fn applicable_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definition
            .registry()
            .all()
            .filter(|f| self.applicability.is_field_applicable(f.key()))
    }

    /// Applicable fields owned by `step`, in step order.
    pub fn step_fields<'a>(&'a self, step: &'a StepDefinition) -> impl Iterator<Item = &'a FieldDefinition> + 'a {
        step.fields()
            .iter()
            .filter(|key| self.applicability.is_field_applicable(key))
            .filter_map(|key| self.definition.field(key))
    }

    pub fn can_advance(&self) -> bool {
        self.current_step()
            .map(|step| can_advance(step, &self.validation, &self.applicability.fields))
            .unwrap_or(false)
    }

    /// Whether `goto(step)` would succeed.
    pub fn can_goto(&self, step: &str) -> bool {
        matches!(self.state, SessionState::Editing { .. })
            && self.applicability.is_step_applicable(step)
            && self
                .definition
                .step_index(step)
                .map_or(false, |i| i <= self.furthest)
    }

    /// Set one field and recompute everything derived from the values.
    ///
    /// A value that would leave no step applicable is rejected with
    /// `NoApplicableStep` and the previous values are kept.
    pub fn set_value(&mut self, key: &str, value: FieldValue) -> Result<(), WizardError> {
        self.ensure_editing()?;
        if !self.definition.registry().contains(key) {
            return Err(WizardError::UnknownField(key.to_string()));
        }
        let previous = self.values.clone();
        self.values.insert(key, value);
        self.recompute();
        if self.applicability.steps.is_empty() {
            tracing::warn!(session = %self.id, field = key, "Rejected value that leaves no step applicable");
            self.values = previous;
            self.recompute();
            return Err(WizardError::NoApplicableStep(self.definition.name().to_string()));
        }
        Ok(())
    }

    /// Move forward, or start the submission from the last applicable step.
    pub fn next(&mut self) -> Result<Advance, WizardError> {
        let current = self.ensure_editing()?.to_string();
        if !self.applicability.is_step_applicable(&current) {
            return Err(WizardError::NoApplicableStep(self.definition.name().to_string()));
        }
        self.ensure_passes(&current)?;

        let position = self.position_of(&current);
        if let Some(next) = position.and_then(|p| self.applicability.steps.get(p + 1)).cloned() {
            self.furthest = self.furthest.max(self.index_of(&next));
            tracing::debug!(session = %self.id, from = %current, to = %next, "Wizard advanced");
            self.state = SessionState::Editing { step: next.clone() };
            return Ok(Advance::Moved { to: next });
        }

        // An earlier step can have been invalidated through a later value.
        let earlier = self
            .applicability
            .steps
            .iter()
            .find(|id| !self.step_passes(id))
            .cloned();
        if let Some(step) = earlier {
            let fields = self.blocking(&step);
            self.state = SessionState::Editing { step: step.clone() };
            return Err(WizardError::Blocked { step, fields });
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.submission_error = None;
        let request = SubmissionRequest {
            ticket,
            method: self.definition.method(),
            endpoint: self.definition.endpoint(&self.values),
            payload: self.definition.payload(&self.values, &self.applicability.fields),
        };
        tracing::info!(
            session = %self.id,
            wizard = self.definition.name(),
            ticket,
            method = %request.method,
            endpoint = %request.endpoint,
            "Submitting wizard"
        );
        self.state = SessionState::Submitting { ticket, step: current };
        Ok(Advance::Submit(request))
    }

    /// Move to the previous applicable step. Stays put on the first one.
    /// Rejected with `SubmissionInFlight` while a submission is pending.
    pub fn back(&mut self) -> Result<&str, WizardError> {
        let current = self.ensure_editing()?.to_string();
        if let Some(prev) = self
            .position_of(&current)
            .filter(|p| *p > 0)
            .and_then(|p| self.applicability.steps.get(p - 1))
            .cloned()
        {
            self.state = SessionState::Editing { step: prev };
        }
        Ok(self.ensure_editing()?)
    }

    /// Jump to an applicable step that has already been reached.
    pub fn goto(&mut self, step: &str) -> Result<(), WizardError> {
        self.ensure_editing()?;
        let index = self
            .definition
            .step_index(step)
            .ok_or_else(|| WizardError::UnknownStep(step.to_string()))?;
        if !self.applicability.is_step_applicable(step) {
            return Err(WizardError::StepNotApplicable(step.to_string()));
        }
        if index > self.furthest {
            return Err(WizardError::StepLocked(step.to_string()));
        }
        self.state = SessionState::Editing { step: step.to_string() };
        Ok(())
    }

    /// Apply the API's answer for submission `ticket`.
    ///
    /// Only the in-flight ticket of a live session is honoured; anything else,
    /// including a response arriving after `cancel`, changes nothing.
    pub fn complete_submission(
        &mut self,
        ticket: u64,
        outcome: Result<SubmittedResource, SubmissionError>,
    ) -> SubmissionOutcome {
        let step = match &self.state {
            SessionState::Submitting { ticket: in_flight, step } if *in_flight == ticket => step.clone(),
            _ => {
                tracing::debug!(session = %self.id, ticket, "Ignoring stale submission response");
                return SubmissionOutcome::Ignored;
            }
        };
        match outcome {
            Ok(resource) => {
                tracing::info!(session = %self.id, ticket, id = ?resource.id, "Submission accepted");
                self.state = SessionState::Submitted { resource };
                SubmissionOutcome::Accepted
            }
            Err(error) => {
                tracing::warn!(session = %self.id, ticket, %error, "Submission rejected");
                let last = self.applicability.steps.last().cloned().unwrap_or(step);
                self.submission_error = Some(error);
                self.state = SessionState::Editing { step: last };
                SubmissionOutcome::Rejected
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.submission_error = None;
    }

    /// Abandon the session. An in-flight submission's response will be ignored.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        if !self.is_active() {
            return Err(WizardError::SessionClosed);
        }
        tracing::debug!(session = %self.id, "Wizard session cancelled");
        self.state = SessionState::Cancelled;
        Ok(())
    }

    fn ensure_editing(&self) -> Result<&str, WizardError> {
        match &self.state {
            SessionState::Editing { step } => Ok(step),
            SessionState::Submitting { .. } => Err(WizardError::SubmissionInFlight),
            SessionState::Submitted { .. } | SessionState::Cancelled => Err(WizardError::SessionClosed),
        }
    }

    fn ensure_passes(&self, step: &str) -> Result<(), WizardError> {
        if self.step_passes(step) {
            Ok(())
        } else {
            Err(WizardError::Blocked {
                step: step.to_string(),
                fields: self.blocking(step),
            })
        }
    }

    fn step_passes(&self, id: &str) -> bool {
        self.definition
            .step(id)
            .map(|s| can_advance(s, &self.validation, &self.applicability.fields))
            .unwrap_or(true)
    }

    fn blocking(&self, id: &str) -> Vec<String> {
        self.definition
            .step(id)
            .map(|s| {
                blocking_fields(s, &self.validation, &self.applicability.fields)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.applicability.steps.iter().position(|s| s == id)
    }

    fn index_of(&self, id: &str) -> usize {
        self.definition.step_index(id).unwrap_or(0)
    }

    fn recompute(&mut self) {
        let (applicability, validation) = self.definition.validate(&self.values, &self.lookups);
        self.applicability = applicability;
        self.validation = validation;
        self.remap_active_step();
    }

    /// Keep the active step if it still applies, else move to the nearest
    /// applicable step at or after it, else to the last one before it.
    fn remap_active_step(&mut self) {
        let SessionState::Editing { step } = &self.state else {
            return;
        };
        if self.applicability.is_step_applicable(step) {
            return;
        }
        let previous = self.index_of(step);
        let steps = &self.applicability.steps;
        let forward = steps.iter().find(|id| self.index_of(id) >= previous);
        let target = forward.or_else(|| steps.iter().rev().find(|id| self.index_of(id) < previous));
        if let Some(target) = target.cloned() {
            tracing::debug!(session = %self.id, from = %step, to = %target, "Active step no longer applies");
            self.furthest = self.furthest.max(self.index_of(&target));
            self.state = SessionState::Editing { step: target };
        }
    }
}
