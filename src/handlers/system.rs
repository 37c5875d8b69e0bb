use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::models::AppState;

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "flows": state.catalog.names(),
        "sessions": state.sessions.len(),
    }))
}
