use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::handlers::helpers::{
    build_template_globals, error_page, not_found, redirect_to, render_template, session_path, TemplateGlobals,
};
use crate::models::{AppState, FlowView};
use crate::services::{
    apply_step_form, field_views, is_last_step, spawn_submission, start_session, step_nav, summary_rows,
};
use crate::templates::{FlowsTemplate, ResultTemplate, StepTemplate};
use crate::utils::parse_urlencoded_body;
use crate::wizard::{Advance, SessionState, SubmissionRequest, WizardError, WizardSession};

pub async fn root_get(State(state): State<AppState>) -> impl IntoResponse {
    redirect_to(&state, "/flows")
}

pub async fn flows_get(State(state): State<AppState>) -> impl IntoResponse {
    let TemplateGlobals {
        api_hostname,
        base_url,
        notices,
        has_notices,
    } = build_template_globals(&state, None);
    render_template(FlowsTemplate {
        api_hostname,
        base_url,
        notices,
        has_notices,
        flows: state.catalog.iter().map(|d| FlowView::from(d.as_ref())).collect(),
    })
}

pub async fn flow_start_post(State(state): State<AppState>, Path(flow): Path<String>) -> Response {
    let Some(definition) = state.catalog.get(&flow) else {
        return not_found(&state, "Wizard");
    };
    match start_session(&state, definition).await {
        Ok(id) => redirect_to(&state, &session_path(&id)),
        Err(e) => {
            tracing::error!(%e, flow = %flow, "Could not open wizard session");
            error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn session_get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(session) = state.sessions.snapshot(&id) else {
        return not_found(&state, "Wizard session");
    };
    let TemplateGlobals {
        api_hostname,
        base_url,
        notices,
        has_notices,
    } = build_template_globals(&state, Some(&id));

    match session.state() {
        SessionState::Editing { .. } | SessionState::Submitting { .. } => {
            let Some(step) = session.current_step() else {
                return not_found(&state, "Wizard step");
            };
            let is_first = session.applicable_steps().next().map(|s| s.id()) == Some(step.id());
            let is_last = is_last_step(&session);
            let submission_error = session
                .submission_error()
                .map(|e| e.to_string())
                .unwrap_or_default();
            render_template(StepTemplate {
                api_hostname,
                base_url,
                notices,
                has_notices,
                session_id: id.clone(),
                flow_title: session.definition().title().to_string(),
                step_id: step.id().to_string(),
                step_title: step.title().to_string(),
                steps: step_nav(&session),
                fields: field_views(&session),
                summary: if is_last { summary_rows(&session) } else { Vec::new() },
                is_first,
                is_last,
                can_advance: session.can_advance(),
                submitting: matches!(session.state(), SessionState::Submitting { .. }),
                has_submission_error: !submission_error.is_empty(),
                submission_error,
            })
        }
        SessionState::Submitted { resource } => {
            let page = ResultTemplate {
                api_hostname,
                base_url,
                notices,
                has_notices,
                flow_title: session.definition().title().to_string(),
                resource_id: resource.id.clone().unwrap_or_default(),
                resource_href: resource.href.clone().unwrap_or_default(),
                summary: summary_rows(&session),
            };
            state.sessions.remove(&id);
            render_template(page)
        }
        SessionState::Cancelled => {
            state.sessions.remove(&id);
            redirect_to(&state, "/flows")
        }
    }
}

/// Apply the posted step inputs, then `event`, under the store lock.
fn handle_event<F>(state: &AppState, id: &str, body: &[u8], event: F) -> Response
where
    F: FnOnce(&mut WizardSession) -> Result<Option<SubmissionRequest>, WizardError>,
{
    let form = parse_urlencoded_body(body);
    let outcome = state.sessions.with_session(id, |session| {
        apply_step_form(session, &form)?;
        event(session)
    });
    match outcome {
        None => not_found(state, "Wizard session"),
        Some(Ok(Some(request))) => {
            spawn_submission(state, id, request);
            redirect_to(state, &session_path(id))
        }
        Some(Ok(None)) => redirect_to(state, &session_path(id)),
        Some(Err(e)) => {
            tracing::debug!(session = %id, %e, "Wizard event rejected");
            state.sessions.push_notice(id, notice_for(&e));
            redirect_to(state, &session_path(id))
        }
    }
}

fn notice_for(error: &WizardError) -> String {
    match error {
        WizardError::Blocked { .. } => "Fix the highlighted fields before continuing.".into(),
        WizardError::SubmissionInFlight => "The request is still being submitted.".into(),
        other => {
            let mut message = other.to_string();
            if let Some(first) = message.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            message
        }
    }
}

pub async fn values_post(State(state): State<AppState>, Path(id): Path<String>, body: Bytes) -> Response {
    handle_event(&state, &id, &body, |_| Ok(None))
}

pub async fn next_post(State(state): State<AppState>, Path(id): Path<String>, body: Bytes) -> Response {
    handle_event(&state, &id, &body, |session| match session.next()? {
        Advance::Moved { .. } => Ok(None),
        Advance::Submit(request) => Ok(Some(request)),
    })
}

pub async fn back_post(State(state): State<AppState>, Path(id): Path<String>, body: Bytes) -> Response {
    handle_event(&state, &id, &body, |session| session.back().map(|_| None))
}

pub async fn goto_post(
    State(state): State<AppState>,
    Path((id, step)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    handle_event(&state, &id, &body, |session| session.goto(&step).map(|_| None))
}

pub async fn dismiss_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.with_session(&id, WizardSession::dismiss_error) {
        Some(()) => redirect_to(&state, &session_path(&id)),
        None => not_found(&state, "Wizard session"),
    }
}

pub async fn cancel_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.with_session(&id, WizardSession::cancel) {
        None => not_found(&state, "Wizard session"),
        Some(result) => {
            if let Err(e) = result {
                tracing::debug!(session = %id, %e, "Cancel on a closed session");
            }
            state.sessions.remove(&id);
            redirect_to(&state, "/flows")
        }
    }
}
