use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use clusterwiz::api::{load_remote_lookups, ApiClient, ApiError};
use clusterwiz::flows::{machine_pool, FlowCatalog};
use clusterwiz::models::AppState;
use clusterwiz::services::spawn_submission;
use clusterwiz::wizard::{Advance, SessionState, SubmissionError, SubmissionOutcome, SubmitMethod};
use serde_json::{json, Value};

/// Serve a fake cluster management API on an ephemeral port.
async fn mock_api() -> String {
    async fn create_pool(Path(cluster): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer t0ken") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"kind": "Error", "reason": "Invalid token"})));
        }
        if body["id"] == "taken" {
            return (
                StatusCode::CONFLICT,
                Json(json!({"kind": "Error", "reason": "Machine pool 'taken' already exists"})),
            );
        }
        let href = format!("/api/clusters_mgmt/v1/clusters/{}/machine_pools/{}", cluster, body["id"].as_str().unwrap_or(""));
        (StatusCode::CREATED, Json(json!({"kind": "MachinePool", "id": body["id"], "href": href})))
    }

    let app = Router::new()
        .route("/api/clusters_mgmt/v1/clusters/:cluster/machine_pools", post(create_pool))
        .route(
            "/api/clusters_mgmt/v1/machine_types",
            get(|| async { Json(json!({"kind": "MachineTypeList", "items": [{"id": "m5.xlarge"}, {"id": "r5.2xlarge"}]})) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str) -> ApiClient {
    ApiClient::new(base, "t0ken", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_submit_success_and_conflict() {
    let base = mock_api().await;
    let api = client(&base);
    let endpoint = "/api/clusters_mgmt/v1/clusters/prod-1/machine_pools";

    let resource = api
        .submit(SubmitMethod::Post, endpoint, &json!({"id": "workers"}))
        .await
        .unwrap();
    assert_eq!(resource.id.as_deref(), Some("workers"));
    assert_eq!(
        resource.href.as_deref(),
        Some("/api/clusters_mgmt/v1/clusters/prod-1/machine_pools/workers")
    );

    let err = api
        .submit(SubmitMethod::Post, endpoint, &json!({"id": "taken"}))
        .await
        .unwrap_err();
    match &err {
        ApiError::Status { status, message } => {
            assert_eq!(*status, 409);
            assert_eq!(message, "Machine pool 'taken' already exists");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    let summary = SubmissionError::from(err);
    assert_eq!(summary.status, Some(409));
}

#[tokio::test]
async fn test_bad_token_is_reported() {
    let base = mock_api().await;
    let api = ApiClient::new(&base, "wrong", Duration::from_secs(5)).unwrap();
    let err = api
        .submit(SubmitMethod::Post, "/api/clusters_mgmt/v1/clusters/x/machine_pools", &json!({"id": "a"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_network_failure() {
    let api = client("http://127.0.0.1:9");
    let err = api.get_json("/anything", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(SubmissionError::from(err).status, None);
}

#[tokio::test]
async fn test_load_remote_lookups() {
    let base = mock_api().await;
    let catalog = FlowCatalog::builtin().unwrap();
    let def = catalog.get(machine_pool::NAME).unwrap();
    let lookups = load_remote_lookups(&client(&base), def.lookup_sources()).await;
    assert_eq!(
        lookups.list(machine_pool::MACHINE_TYPES),
        Some(&["m5.xlarge".to_string(), "r5.2xlarge".to_string()][..])
    );
}

async fn submit_through_store(name: &str) -> (AppState, String, SubmissionOutcome) {
    let base = mock_api().await;
    let state = AppState::new(FlowCatalog::builtin().unwrap(), client(&base), String::new());
    let def = state.catalog.get(machine_pool::NAME).unwrap();
    let lookups = load_remote_lookups(&state.api, def.lookup_sources()).await;
    let id = state.sessions.create(def, lookups).unwrap();

    let request = state
        .sessions
        .with_session(&id, |s| {
            s.set_value("cluster_id", json!("prod-1")).unwrap();
            s.set_value("name", json!(name)).unwrap();
            s.set_value("instance_type", json!("r5.2xlarge")).unwrap();
            loop {
                match s.next().unwrap() {
                    Advance::Moved { .. } => continue,
                    Advance::Submit(request) => break request,
                }
            }
        })
        .unwrap();

    let outcome = spawn_submission(&state, &id, request).await.unwrap().unwrap();
    (state, id, outcome)
}

#[tokio::test]
async fn test_spawned_submission_completes_session() {
    let (state, id, outcome) = submit_through_store("workers").await;
    assert_eq!(outcome, SubmissionOutcome::Accepted);
    let session = state.sessions.snapshot(&id).unwrap();
    assert!(matches!(session.state(), SessionState::Submitted { resource } if resource.id.as_deref() == Some("workers")));
}

#[tokio::test]
async fn test_spawned_submission_failure_returns_to_review() {
    let (state, id, outcome) = submit_through_store("taken").await;
    assert_eq!(outcome, SubmissionOutcome::Rejected);
    let session = state.sessions.snapshot(&id).unwrap();
    assert_eq!(session.current_step().unwrap().id(), "review");
    assert_eq!(
        session.submission_error().map(|e| e.message.clone()),
        Some("Machine pool 'taken' already exists".to_string())
    );
}

#[tokio::test]
async fn test_response_for_removed_session_is_dropped() {
    let base = mock_api().await;
    let state = AppState::new(FlowCatalog::builtin().unwrap(), client(&base), String::new());
    let def = state.catalog.get(machine_pool::NAME).unwrap();
    let id = state.sessions.create(def, Default::default()).unwrap();
    let request = clusterwiz::wizard::SubmissionRequest {
        ticket: 1,
        method: SubmitMethod::Post,
        endpoint: "/api/clusters_mgmt/v1/clusters/prod-1/machine_pools".into(),
        payload: json!({"id": "late"}),
    };
    state.sessions.remove(&id);
    assert_eq!(spawn_submission(&state, &id, request).await.unwrap(), None);
}
