use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::models::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_get))
        .route("/flows", get(handlers::flows_get))
        .route("/flows/:flow", post(handlers::flow_start_post))
        .route("/sessions/:id", get(handlers::session_get))
        .route("/sessions/:id/values", post(handlers::values_post))
        .route("/sessions/:id/next", post(handlers::next_post))
        .route("/sessions/:id/back", post(handlers::back_post))
        .route("/sessions/:id/goto/:step", post(handlers::goto_post))
        .route("/sessions/:id/dismiss", post(handlers::dismiss_post))
        .route("/sessions/:id/cancel", post(handlers::cancel_post))
        .route("/healthz", get(handlers::healthz))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Wizard pages reflect live session state.
                .layer(SetResponseHeaderLayer::if_not_present(
                    CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
        .with_state(state)
}
