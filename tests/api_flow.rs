//! Integration tests for the HTTP API
//!
//! Each test builds a fresh router over an in-memory database and drives it
//! with `tower::ServiceExt::oneshot`, so no socket is bound.

use apnisec_backend::{
    app::{create_router, AppState},
    config::AppConfig,
    db::Database,
    notify::{LogMailer, Notifier},
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CLIENT: &str = "198.51.100.7";

fn test_app(rate_limit_max: u32) -> Router {
    let args = vec![
        "apnisec".to_string(),
        "--rate-limit-max".to_string(),
        rate_limit_max.to_string(),
        "--bcrypt-cost".to_string(),
        "4".to_string(),
        "--jwt-secret".to_string(),
        "test-access-secret".to_string(),
        "--refresh-secret".to_string(),
        "test-refresh-secret".to_string(),
    ];
    let config = AppConfig::parse_from(args);
    let db = Database::in_memory().expect("in-memory database");
    let notifier = Notifier::spawn(Arc::new(LogMailer), 16);
    create_router(AppState::new(&config, db, notifier))
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    call_from(app, CLIENT, method, uri, token, body.map(|b| b.to_string())).await
}

async fn call_from(
    app: &Router,
    client: &str,
    method: &str,
    uri: &str,
    token: Option<&str>,
    raw_body: Option<String>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match raw_body {
        Some(raw) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register and return (access token, user id)
async fn register(app: &Router, email: &str, name: &str) -> (String, String) {
    let resp = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "password123", "name": name })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "register failed: {}", resp.body);
    (
        resp.body["data"]["token"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string(),
        resp.body["data"]["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create_issue(app: &Router, token: &str, title: &str, issue_type: &str) -> Value {
    let resp = call(
        app,
        "POST",
        "/issues",
        Some(token),
        Some(json!({
            "title": title,
            "description": "A long enough description",
            "type": issue_type,
        })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK, "create failed: {}", resp.body);
    resp.body["data"].clone()
}

#[tokio::test]
async fn test_health() {
    let app = test_app(100);
    let resp = call(&app, "GET", "/health", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "healthy");
}

#[tokio::test]
async fn test_register_then_me() {
    let app = test_app(100);
    let resp = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "password123", "name": "Ann" })),
    )
    .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["success"], true);
    let user = &resp.body["data"]["user"];
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["role"], "USER");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
    assert!(resp.body["data"]["token"]["refreshToken"].is_string());

    let token = resp.body["data"]["token"]["accessToken"].as_str().unwrap();
    let me = call(&app, "GET", "/auth/me", Some(token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["id"], user["id"]);
    assert_eq!(me.body["data"]["name"], "Ann");
}

#[tokio::test]
async fn test_register_validation_aggregates_messages() {
    let app = test_app(100);
    let resp = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "bad", "password": "short", "name": "A" })),
    )
    .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["success"], false);
    let message = resp.body["message"].as_str().unwrap();
    assert!(message.contains("email"));
    assert!(message.contains("Password"));
    assert!(message.contains("Name"));
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = test_app(100);
    register(&app, "a@x.com", "Ann").await;

    let resp = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "password456", "name": "Other" })),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["message"], "Email already registered");
}

#[tokio::test]
async fn test_login_does_not_reveal_which_part_failed() {
    let app = test_app(100);
    register(&app, "a@x.com", "Ann").await;

    let wrong_password = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "not-the-password" })),
    )
    .await;
    let unknown_email = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "password123" })),
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);

    let ok = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "password123" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.body["data"]["token"]["accessToken"].is_string());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = test_app(100);
    let resp = call_from(
        &app,
        CLIENT,
        "POST",
        "/auth/login",
        None,
        Some("{not json".to_string()),
    )
    .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["message"], "Invalid JSON body");

    let (token, _) = register(&app, "a@x.com", "Ann").await;
    let wrong_type = call(
        &app,
        "POST",
        "/issues",
        Some(&token),
        Some(json!({ "title": 123, "description": "A long enough description", "type": "VAPT" })),
    )
    .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.body["success"], false);
    assert!(wrong_type.body["message"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_guarded_routes_require_token() {
    let app = test_app(100);

    let missing = call(&app, "GET", "/issues", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "User not authenticated");

    let invalid = call(&app, "GET", "/users/profile", Some("garbage"), None).await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.body["message"], "Invalid token");
}

#[tokio::test]
async fn test_issue_ownership() {
    let app = test_app(100);
    let (ann, _) = register(&app, "a@x.com", "Ann").await;
    let (bob, _) = register(&app, "b@x.com", "Bob").await;

    let issue = create_issue(&app, &ann, "Exposed bucket", "CLOUD_SECURITY").await;
    assert_eq!(issue["priority"], "LOW");
    assert_eq!(issue["status"], "OPEN");
    let path = format!("/issues/{}", issue["id"].as_str().unwrap());

    let view = call(&app, "GET", &path, Some(&bob), None).await;
    assert_eq!(view.status, StatusCode::FORBIDDEN);

    let update = call(
        &app,
        "PUT",
        &path,
        Some(&bob),
        Some(json!({ "status": "CLOSED" })),
    )
    .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let delete = call(&app, "DELETE", &path, Some(&bob), None).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    let bob_list = call(&app, "GET", "/issues", Some(&bob), None).await;
    assert_eq!(bob_list.body["data"], json!([]));

    let missing = call(
        &app,
        "GET",
        "/issues/00000000-0000-0000-0000-000000000000",
        Some(&ann),
        None,
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let owner_view = call(&app, "GET", &path, Some(&ann), None).await;
    assert_eq!(owner_view.status, StatusCode::OK);
    assert_eq!(owner_view.body["data"]["status"], "OPEN");
}

#[tokio::test]
async fn test_list_filters_and_orders_newest_first() {
    let app = test_app(100);
    let (ann, _) = register(&app, "a@x.com", "Ann").await;

    let first = create_issue(&app, &ann, "First finding", "VAPT").await;
    let second = create_issue(&app, &ann, "Second finding", "CLOUD_SECURITY").await;
    let third = create_issue(&app, &ann, "Third finding", "VAPT").await;

    let all = call(&app, "GET", "/issues", Some(&ann), None).await;
    let ids: Vec<&Value> = all.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| &i["id"])
        .collect();
    assert_eq!(ids, vec![&third["id"], &second["id"], &first["id"]]);

    let vapt = call(&app, "GET", "/issues?type=VAPT", Some(&ann), None).await;
    let ids: Vec<&Value> = vapt.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| &i["id"])
        .collect();
    assert_eq!(ids, vec![&third["id"], &first["id"]]);

    // Repeated keys stay inside the envelope; the first value wins
    let repeated = call(&app, "GET", "/issues?type=VAPT&type=BOGUS", Some(&ann), None).await;
    assert_eq!(repeated.status, StatusCode::OK);
    assert_eq!(repeated.body["success"], true);
    assert_eq!(repeated.body["data"].as_array().unwrap().len(), 2);

    let unknown = call(&app, "GET", "/issues?type=bogus", Some(&ann), None).await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(unknown.body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_end_to_end_issue_lifecycle() {
    let app = test_app(100);
    let (token, user_id) = register(&app, "a@x.com", "Ann").await;

    let issue = create_issue(&app, &token, "SQL injection", "VAPT").await;
    assert_eq!(issue["userId"], user_id.as_str());
    let path = format!("/issues/{}", issue["id"].as_str().unwrap());

    let updated = call(
        &app,
        "PUT",
        &path,
        Some(&token),
        Some(json!({ "status": "IN_PROGRESS", "priority": "HIGH" })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["status"], "IN_PROGRESS");
    assert_eq!(updated.body["data"]["priority"], "HIGH");
    assert_eq!(updated.body["data"]["title"], "SQL injection");
    assert_eq!(updated.body["data"]["userId"], user_id.as_str());

    let bad_update = call(
        &app,
        "PUT",
        &path,
        Some(&token),
        Some(json!({ "type": "PHISHING" })),
    )
    .await;
    assert_eq!(bad_update.status, StatusCode::BAD_REQUEST);

    let deleted = call(&app, "DELETE", &path, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = call(&app, "GET", &path, Some(&token), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update() {
    let app = test_app(100);
    let (token, _) = register(&app, "a@x.com", "Ann").await;

    let short = call(
        &app,
        "PUT",
        "/users/profile",
        Some(&token),
        Some(json!({ "name": "A" })),
    )
    .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let renamed = call(
        &app,
        "PUT",
        "/users/profile",
        Some(&token),
        Some(json!({ "name": "Annie" })),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["data"]["name"], "Annie");

    let profile = call(&app, "GET", "/users/profile", Some(&token), None).await;
    assert_eq!(profile.body["data"]["name"], "Annie");
    assert_eq!(profile.body["data"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = test_app(3);
    let (token, _) = register(&app, "a@x.com", "Ann").await;

    for expected_remaining in ["2", "1", "0"] {
        let resp = call(&app, "GET", "/issues", Some(&token), None).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.headers["x-ratelimit-remaining"], expected_remaining);
    }

    let limited = call(&app, "GET", "/issues", Some(&token), None).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["message"], "Rate limit exceeded");
    assert!(limited.headers.contains_key(header::RETRY_AFTER));

    // Another client address has its own window
    let other = call_from(&app, "203.0.113.9", "GET", "/issues", Some(&token), None).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_applies_before_authentication() {
    let app = test_app(2);

    for _ in 0..2 {
        let resp = call(&app, "GET", "/issues", None, None).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    let resp = call(&app, "GET", "/issues", None, None).await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
}
