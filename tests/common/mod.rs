//! Shared helpers for integration tests: a real AppState over a temp-file
//! database, and request plumbing for driving the router with oneshot.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use xobikey::db::{self, AppState};
use xobikey::handlers;
use xobikey::middleware::SharedSecretAuthorizer;

pub const TEST_ADMIN_SECRET: &str = "test-admin-secret";

pub struct TestContext {
    pub state: AppState,
    // Held so the database outlives the test
    _db_dir: TempDir,
}

pub fn create_test_context() -> TestContext {
    let db_dir = tempfile::tempdir().unwrap();
    let db_path = db_dir.path().join("xobikey-test.db");

    let pool = db::create_pool(db_path.to_str().unwrap()).unwrap();
    {
        let conn = pool.get().unwrap();
        db::init_schema(&conn).unwrap();
    }

    TestContext {
        state: AppState {
            db: pool,
            admin_auth: Arc::new(SharedSecretAuthorizer::new(TEST_ADMIN_SECRET)),
            generate_cap: 100,
        },
        _db_dir: db_dir,
    }
}

pub fn app(ctx: &TestContext) -> Router {
    handlers::app(ctx.state.clone())
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_admin(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_json_with_token(app, uri, body, TEST_ADMIN_SECRET).await
}

pub async fn post_json_with_token(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_admin(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {TEST_ADMIN_SECRET}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
