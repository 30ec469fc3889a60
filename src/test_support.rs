//! Helpers for driving the full router in tests.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{app::build_app, state::AppState};

pub fn app() -> (Router, AppState) {
    let state = AppState::fake();
    (build_app(state.clone()), state)
}

pub fn app_with(state: AppState) -> Router {
    build_app(state)
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Value::Null` for an empty body, a string for non-JSON text).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");

    let res = app.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = res.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Registers a user and returns its access token and id.
pub async fn register(app: &Router, email: &str) -> (String, Uuid) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({"email": email, "password": "correct-horse", "name": "Test User"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let token = body["access_token"].as_str().expect("access token").to_string();
    let id = body["user"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("user id");
    (token, id)
}
