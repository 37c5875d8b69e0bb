use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::load_remote_lookups;
use crate::models::{AppState, FieldView, StepNavView, SummaryRow};
use crate::utils::value_to_short_string;
use crate::wizard::{SubmissionError, SubmissionOutcome, SubmissionRequest, WizardDefinition, WizardError, WizardSession};

/// Copy the posted inputs of the active step into the session.
///
/// Only keys owned by the active step are read; a repeated key keeps its last
/// value, so toggles can post a hidden empty input before the checkbox.
pub fn apply_step_form(session: &mut WizardSession, form: &HashMap<String, Vec<String>>) -> Result<(), WizardError> {
    let Some(step) = session.current_step() else {
        return Ok(());
    };
    let updates: Vec<_> = step
        .fields()
        .iter()
        .filter_map(|key| {
            let raw = form.get(key).and_then(|v| v.last())?;
            let field = session.definition().field(key)?;
            Some((key.clone(), field.kind().parse_input(raw)))
        })
        .collect();
    for (key, value) in updates {
        session.set_value(&key, value)?;
    }
    Ok(())
}

/// Progress bar entries for the applicable steps.
pub fn step_nav(session: &WizardSession) -> Vec<StepNavView> {
    let current = session.current_step().map(|s| s.id().to_string());
    session
        .applicable_steps()
        .enumerate()
        .map(|(i, step)| StepNavView {
            id: step.id().to_string(),
            title: step.title().to_string(),
            number: i + 1,
            is_current: current.as_deref() == Some(step.id()),
            reachable: session.can_goto(step.id()),
        })
        .collect()
}

/// Inputs of the active step, with their current value and error.
pub fn field_views(session: &WizardSession) -> Vec<FieldView> {
    let Some(step) = session.current_step() else {
        return Vec::new();
    };
    session
        .step_fields(step)
        .map(|field| {
            FieldView::build(
                field,
                session.values().get(field.key()),
                session.validation().error(field.key()),
                session.lookups(),
            )
        })
        .collect()
}

/// Every applicable, non-empty value, for review.
pub fn summary_rows(session: &WizardSession) -> Vec<SummaryRow> {
    session
        .applicable_fields()
        .filter_map(|field| {
            let value = session.values().get(field.key())?;
            let text = value_to_short_string(value);
            if text.is_empty() {
                return None;
            }
            Some(SummaryRow {
                label: field.label().to_string(),
                value: text,
            })
        })
        .collect()
}

/// Whether the active step is the last applicable one.
pub fn is_last_step(session: &WizardSession) -> bool {
    match (session.current_step(), session.applicable_steps().last()) {
        (Some(current), Some(last)) => current.id() == last.id(),
        _ => false,
    }
}

/// Load the flow's lookups and open a session on it.
pub async fn start_session(state: &AppState, definition: Arc<WizardDefinition>) -> Result<String, WizardError> {
    let lookups = load_remote_lookups(&state.api, definition.lookup_sources()).await;
    let id = state.sessions.create(definition.clone(), lookups)?;
    tracing::info!(session = %id, wizard = definition.name(), "Started wizard session");
    Ok(id)
}

/// Send the submission in the background and hand the answer back to the
/// session, if it still exists.
pub fn spawn_submission(state: &AppState, session_id: &str, request: SubmissionRequest) -> JoinHandle<Option<SubmissionOutcome>> {
    let api = state.api.clone();
    let sessions = state.sessions.clone();
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        let result = api
            .submit(request.method, &request.endpoint, &request.payload)
            .await
            .map_err(SubmissionError::from);
        let outcome = sessions.with_session(&session_id, |s| s.complete_submission(request.ticket, result));
        if outcome.is_none() {
            tracing::debug!(session = %session_id, "Session closed before its submission finished");
        }
        outcome
    })
}
