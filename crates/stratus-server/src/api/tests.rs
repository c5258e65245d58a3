// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router tests over an in-memory store and a static identity table.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use stratus_core::driver::DriverConfig;
use stratus_core::registry::RunRegistry;
use stratus_core::status::RunStatus;
use stratus_core::store::{NewProject, SqliteStore, Store};

use super::{AppState, router};
use crate::auth::StaticIdentityProvider;
use crate::chat::ChatClient;

struct TestApp {
    state: Arc<AppState>,
}

impl TestApp {
    async fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().await.unwrap());
        let identity = StaticIdentityProvider::new()
            .with_user("tok-1", "user-1")
            .with_user("tok-2", "user-2");
        let registry = RunRegistry::new(
            store.clone(),
            DriverConfig {
                base_delay: Duration::from_millis(1),
                max_jitter: Duration::from_millis(2),
            },
        );
        let state = Arc::new(AppState {
            store,
            registry,
            identity: Arc::new(identity),
            chat: ChatClient::new("http://127.0.0.1:1/v1/chat", None, "test-model"),
            domain_suffix: "stratus.dev".to_string(),
        });
        Self { state }
    }

    fn router(&self) -> Router {
        router(self.state.clone())
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.router()
            .oneshot(
                builder
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Seed a project owned by `owner` without going through deploy.
    async fn seed_project(&self, name: &str, owner: Option<&str>) -> String {
        self.state
            .store
            .upsert_project(&NewProject {
                name: name.to_string(),
                repo: None,
                framework: None,
                region: None,
                domain: format!("{name}.stratus.dev"),
                owner_id: owner.map(str::to_string),
            })
            .await
            .unwrap()
            .id
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let app = TestApp::new().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert!(body["now"].is_string());
}

#[tokio::test]
async fn projects_require_authentication() {
    let app = TestApp::new().await;

    let response = app.get("/api/projects", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/projects", Some("bogus")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn projects_are_owner_filtered() {
    let app = TestApp::new().await;
    app.seed_project("mine", Some("user-1")).await;
    app.seed_project("theirs", Some("user-2")).await;

    let response = app.get("/api/projects", Some("tok-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let projects = body["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], json!("mine"));
}

#[tokio::test]
async fn deploy_requires_authentication() {
    let app = TestApp::new().await;
    let response = app
        .post("/api/deploy", None, json!({ "payload": { "name": "alpha" } }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deploy_without_name_creates_nothing() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/deploy", Some("tok-1"), json!({ "payload": {} }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/deploy", Some("tok-1"), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let projects = app.state.store.list_projects_by_owner("user-1").await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn deploy_rejects_name_with_no_alphanumeric_characters() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/deploy", Some("tok-1"), json!({ "payload": { "name": "***" } }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let projects = app.state.store.list_projects_by_owner("user-1").await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn deploy_creates_queued_run_and_derived_domain() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/deploy",
            Some("tok-1"),
            json!({ "payload": { "name": "My Shop", "framework": "nextjs" } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("queued"));
    let run_id = body["runId"].as_str().unwrap().to_string();
    let project_id = body["projectId"].as_str().unwrap().to_string();

    let project = app.state.store.get_project(&project_id).await.unwrap().unwrap();
    assert_eq!(project.domain, "my-shop.stratus.dev");
    assert_eq!(project.owner_id.as_deref(), Some("user-1"));

    // The driver runs detached; the run terminates on its own.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let run = app.state.store.get_run(&run_id).await.unwrap().unwrap();
        if run.run_status().is_terminal() {
            assert_eq!(run.run_status(), RunStatus::Success);
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "run never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn second_deploy_updates_instead_of_duplicating() {
    let app = TestApp::new().await;

    let first = body_json(
        app.post("/api/deploy", Some("tok-1"), json!({ "payload": { "name": "alpha" } }))
            .await,
    )
    .await;
    let second = body_json(
        app.post(
            "/api/deploy",
            Some("tok-1"),
            json!({ "payload": { "name": "alpha", "repo": "github.com/acme/alpha" } }),
        )
        .await,
    )
    .await;

    assert_eq!(first["projectId"], second["projectId"]);
    assert_ne!(first["runId"], second["runId"]);

    let projects = app.state.store.list_projects_by_owner("user-1").await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].repo.as_deref(), Some("github.com/acme/alpha"));
}

#[tokio::test]
async fn run_list_requires_project_id() {
    let app = TestApp::new().await;
    let response = app.get("/api/runs", Some("tok-1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn run_list_checks_ownership() {
    let app = TestApp::new().await;
    let project_id = app.seed_project("theirs", Some("user-2")).await;

    let response = app
        .get(&format!("/api/runs?project_id={project_id}"), Some("tok-1"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get(&format!("/api/runs?project_id={project_id}"), Some("tok-2"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn run_detail_hides_other_owners_data() {
    let app = TestApp::new().await;

    let deploy = body_json(
        app.post("/api/deploy", Some("tok-2"), json!({ "payload": { "name": "secret" } }))
            .await,
    )
    .await;
    let run_id = deploy["runId"].as_str().unwrap();

    let response = app.get(&format!("/api/runs/{run_id}"), Some("tok-1")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    // Only the error field, no leaked run or log content.
    assert!(body.get("run").is_none());
    assert!(body.get("logs").is_none());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn run_detail_returns_run_and_logs() {
    let app = TestApp::new().await;

    let deploy = body_json(
        app.post("/api/deploy", Some("tok-1"), json!({ "payload": { "name": "beta" } }))
            .await,
    )
    .await;
    let run_id = deploy["runId"].as_str().unwrap();

    let response = app.get(&format!("/api/runs/{run_id}"), Some("tok-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["run"]["id"], json!(run_id));
    assert!(body["logs"].is_array());
}

#[tokio::test]
async fn run_detail_unknown_run_is_404() {
    let app = TestApp::new().await;
    let response = app.get("/api/runs/no-such-run", Some("tok-1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn log_append_validates_message() {
    let app = TestApp::new().await;
    let project_id = app.seed_project("logs", Some("user-1")).await;
    let run = app.state.registry.create_run(&project_id).await.unwrap();

    let response = app
        .post(&format!("/api/logs/{}", run.id), None, json!({ "message": "" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(&format!("/api/logs/{}", run.id), None, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was appended by the rejected requests.
    let logs = app.state.store.list_logs(&run.id).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn log_append_rejects_unknown_level() {
    let app = TestApp::new().await;
    let project_id = app.seed_project("levels", Some("user-1")).await;
    let run = app.state.registry.create_run(&project_id).await.unwrap();

    let response = app
        .post(
            &format!("/api/logs/{}", run.id),
            None,
            json!({ "level": "fatal", "message": "boom" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn log_append_writes_entry() {
    let app = TestApp::new().await;
    let project_id = app.seed_project("writes", Some("user-1")).await;
    let run = app.state.registry.create_run(&project_id).await.unwrap();

    let response = app
        .post(
            &format!("/api/logs/{}", run.id),
            None,
            json!({ "level": "error", "message": "external failure" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["log"]["message"], json!("external failure"));
    assert_eq!(body["log"]["level"], json!("error"));
}

#[tokio::test]
async fn log_append_to_unknown_run_is_404() {
    let app = TestApp::new().await;
    let response = app
        .post("/api/logs/no-such-run", None, json!({ "message": "hello" }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_without_upstream_is_501() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/chat",
            None,
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}
