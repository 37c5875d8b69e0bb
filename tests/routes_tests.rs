use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use clusterwiz::api::ApiClient;
use clusterwiz::flows::FlowCatalog;
use clusterwiz::models::AppState;
use clusterwiz::routes::build_router;
use tower::ServiceExt;

fn test_state() -> AppState {
    // Nothing listens here; lookups fail fast and are skipped.
    let api = ApiClient::new("http://127.0.0.1:9", "", Duration::from_secs(1)).unwrap();
    AppState::new(FlowCatalog::builtin().unwrap(), api, String::new())
}

async fn send(app: &Router, method: &str, uri: &str, form: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn start(app: &Router, flow: &str) -> String {
    let response = send(app, "POST", &format!("/flows/{}", flow), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = location(&response);
    location
        .strip_prefix("/sessions/")
        .expect("redirects to the session")
        .to_string()
}

#[tokio::test]
async fn test_healthz() {
    let app = build_router(test_state());
    let response = send(&app, "GET", "/healthz", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["flows"][0], "machine-pool");
}

#[tokio::test]
async fn test_root_redirects_to_flows() {
    let app = build_router(test_state());
    let response = send(&app, "GET", "/", "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/flows");
}

#[tokio::test]
async fn test_flows_page_lists_wizards() {
    let app = build_router(test_state());
    let response = send(&app, "GET", "/flows", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let html = body_text(response).await;
    assert!(html.contains("Add machine pool"));
    assert!(html.contains("Edit cluster-wide proxy"));
    assert!(html.contains("/flows/upgrade-policy"));
}

#[tokio::test]
async fn test_unknown_flow_and_session_are_not_found() {
    let app = build_router(test_state());
    assert_eq!(send(&app, "POST", "/flows/nope", "").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, "GET", "/sessions/nope", "").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, "POST", "/sessions/nope/next", "").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_step_navigation_through_forms() {
    let state = test_state();
    let app = build_router(state.clone());
    let id = start(&app, "cluster-proxy").await;

    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(html.contains("Cluster ID"));

    let response = send(&app, "POST", &format!("/sessions/{}/next", id), "cluster_id=prod-1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/sessions/{}", id));
    let session = state.sessions.snapshot(&id).unwrap();
    assert_eq!(session.current_step().unwrap().id(), "proxy");
    assert_eq!(session.values().text("cluster_id"), Some("prod-1"));

    // Nothing configured: the step is blocked and the page says so once.
    let response = send(&app, "POST", &format!("/sessions/{}/next", id), "http_proxy=&https_proxy=").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(html.contains("Fix the highlighted fields before continuing."));
    assert!(html.contains("Configure at least one of"));
    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(!html.contains("Fix the highlighted fields before continuing."));

    // Entering a proxy reveals the no-proxy list on the next render.
    send(&app, "POST", &format!("/sessions/{}/values", id), "http_proxy=http%3A%2F%2Fproxy%3A3128").await;
    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(html.contains("No proxy domains"));

    send(&app, "POST", &format!("/sessions/{}/goto/cluster", id), "").await;
    let session = state.sessions.snapshot(&id).unwrap();
    assert_eq!(session.current_step().unwrap().id(), "cluster");
    assert_eq!(session.values().text("http_proxy"), Some("http://proxy:3128"));
}

#[tokio::test]
async fn test_locked_step_reports_notice() {
    let state = test_state();
    let app = build_router(state.clone());
    let id = start(&app, "machine-pool").await;

    send(&app, "POST", &format!("/sessions/{}/goto/labels", id), "").await;
    assert_eq!(
        state.sessions.snapshot(&id).unwrap().current_step().unwrap().id(),
        "details"
    );
    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(html.contains("Step `labels` has not been reached yet"));
}

#[tokio::test]
async fn test_toggle_uses_last_posted_value() {
    let state = test_state();
    let app = build_router(state.clone());
    let id = start(&app, "machine-pool").await;
    send(
        &app,
        "POST",
        &format!("/sessions/{}/next", id),
        "cluster_id=prod-1&name=workers&cloud_provider=aws&instance_type=m5.xlarge",
    )
    .await;
    assert_eq!(
        state.sessions.snapshot(&id).unwrap().current_step().unwrap().id(),
        "scaling"
    );

    send(&app, "POST", &format!("/sessions/{}/values", id), "autoscaling=&autoscaling=on").await;
    assert!(state.sessions.snapshot(&id).unwrap().values().flag("autoscaling"));
    send(&app, "POST", &format!("/sessions/{}/values", id), "autoscaling=").await;
    assert!(!state.sessions.snapshot(&id).unwrap().values().flag("autoscaling"));
}

#[tokio::test]
async fn test_cancel_removes_session() {
    let state = test_state();
    let app = build_router(state.clone());
    let id = start(&app, "upgrade-policy").await;
    assert!(state.sessions.contains(&id));

    let response = send(&app, "POST", &format!("/sessions/{}/cancel", id), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/flows");
    assert!(!state.sessions.contains(&id));
}

#[tokio::test]
async fn test_unfetched_lookup_falls_back_to_text_input() {
    let app = build_router(test_state());
    let id = start(&app, "machine-pool").await;
    let html = body_text(send(&app, "GET", &format!("/sessions/{}", id), "").await).await;
    assert!(html.contains(r#"<input id="instance_type" name="instance_type" type="text""#));
    assert!(!html.contains(r#"<select id="instance_type""#));
}
