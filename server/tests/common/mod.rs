#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

use server::{
    config::{AppConfig, BulkInsertMode},
    http::{build_router, AppState},
};

pub const TEST_SECRET: &str = "integration-test-secret";

pub async fn test_state(mode: BulkInsertMode) -> AppState {
    test_state_with(|config| config.bulk_insert_mode = mode).await
}

pub async fn test_state_with(customize: impl FnOnce(&mut AppConfig)) -> AppState {
    // Single connection so every query sees the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let mut config = AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt_secret: TEST_SECRET.into(),
        token_ttl_minutes: 30,
        bulk_insert_mode: BulkInsertMode::Strict,
        open_registration: false,
        cors_allowed_origins: Vec::new(),
    };
    customize(&mut config);
    AppState::new(db, Arc::new(config))
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Request with a verbatim body, for payloads that are not valid JSON.
pub fn raw_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/login",
            None,
            Some(json!({"username": username, "password": password})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

pub struct TestEnv {
    pub router: Router,
    pub state: AppState,
    pub admin_token: String,
    pub manager_token: String,
    pub employee_token: String,
}

/// Migrated in-memory database with one user per role, registered through
/// the API (the first registration exercises the bootstrap exception).
pub async fn setup(mode: BulkInsertMode) -> TestEnv {
    let state = test_state(mode).await;
    let router = build_router(state.clone());

    let (status, body) = send(
        &router,
        json_request(
            "POST",
            "/register",
            None,
            Some(json!({"username": "root", "password": "rootpw", "role": "admin"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "bootstrap failed: {body}");
    let admin_token = login(&router, "root", "rootpw").await;

    let (status, body) = send(
        &router,
        json_request(
            "POST",
            "/register",
            Some(&admin_token),
            Some(json!([
                {"username": "mgr", "password": "mgrpw", "role": "manager"},
                {"username": "emp", "password": "emppw", "role": "employee"},
            ])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let manager_token = login(&router, "mgr", "mgrpw").await;
    let employee_token = login(&router, "emp", "emppw").await;

    TestEnv {
        router,
        state,
        admin_token,
        manager_token,
        employee_token,
    }
}

pub fn employee(name: &str, salary: i32, department: &str) -> Value {
    json!({"name": name, "salary": salary, "department": department})
}

/// Create employees as admin and assert success.
pub async fn create_employees(env: &TestEnv, payload: Value) -> Value {
    let (status, body) = send(
        &env.router,
        json_request("POST", "/employees", Some(&env.admin_token), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

/// All employees ordered by id, as `(id, sr_no, name)` triples.
pub async fn roster(env: &TestEnv) -> Vec<(i64, i64, String)> {
    let (status, body) = send(
        &env.router,
        json_request(
            "GET",
            "/employees?sort_by=id&size=100",
            Some(&env.admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "list failed: {body}");
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            (
                item["id"].as_i64().unwrap(),
                item["sr_no"].as_i64().unwrap(),
                item["name"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}
