use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::models::AppState;
use crate::templates::ErrorTemplate;

#[derive(Default)]
pub struct TemplateGlobals {
    pub api_hostname: String,
    pub base_url: String,
    pub notices: Vec<String>,
    pub has_notices: bool,
}

/// Globals for a page; pending notices of `session_id` are consumed.
pub fn build_template_globals(state: &AppState, session_id: Option<&str>) -> TemplateGlobals {
    let notices = session_id
        .map(|id| state.sessions.take_notices(id))
        .unwrap_or_default();
    let has_notices = !notices.is_empty();
    TemplateGlobals {
        api_hostname: crate::utils::hostname_from_url(&state.api_base_url),
        base_url: state.public_base_url.clone(),
        notices,
        has_notices,
    }
}

pub fn absolute_url_from_state(state: &AppState, path: &str) -> String {
    crate::utils::absolute_url(&state.public_base_url, path)
}

pub fn redirect_to(state: &AppState, path: &str) -> Response {
    Redirect::to(&absolute_url_from_state(state, path)).into_response()
}

pub fn session_path(session_id: &str) -> String {
    format!("/sessions/{}", session_id)
}

pub fn render_template<T: askama::Template>(t: T) -> Response {
    render_template_with_status(StatusCode::OK, t)
}

pub fn render_template_with_status<T: askama::Template>(status: StatusCode, t: T) -> Response {
    match t.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(%e, "Template render error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub fn error_page(state: &AppState, status: StatusCode, message: impl Into<String>) -> Response {
    let TemplateGlobals {
        api_hostname,
        base_url,
        notices,
        has_notices,
    } = build_template_globals(state, None);
    render_template_with_status(
        status,
        ErrorTemplate {
            api_hostname,
            base_url,
            notices,
            has_notices,
            status_code: status.as_u16(),
            message: message.into(),
        },
    )
}

pub fn not_found(state: &AppState, what: &str) -> Response {
    error_page(state, StatusCode::NOT_FOUND, format!("{} not found", what))
}
