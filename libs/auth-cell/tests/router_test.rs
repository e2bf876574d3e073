use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_cell::router::auth_routes;
use auth_cell::{IdentityService, MemoryUserStore, NewUser, RecordingNotifier};
use shared_models::auth::UserRole;
use shared_utils::clock::SystemClock;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn create_test_app() -> (Router, Arc<IdentityService>) {
    let config = TestConfig::default().to_arc();
    let identity = Arc::new(IdentityService::new(
        &config,
        Arc::new(MemoryUserStore::new()),
        Arc::new(SystemClock),
        Arc::new(RecordingNotifier::new()),
    ));
    (auth_routes(config, identity.clone()), identity)
}

async fn seed_user(identity: &IdentityService) -> auth_cell::UserRecord {
    identity
        .create_user(NewUser {
            email: "patient@example.com".to_string(),
            password: "password123".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Ient".to_string(),
            phone_number: None,
            address: None,
            date_of_birth: None,
            gender: None,
            role: UserRole::Patient,
        })
        .await
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_login_endpoint() {
    let (app, identity) = create_test_app().await;
    let user = seed_user(&identity).await;

    let response = app
        .oneshot(json_request("POST", "/login", json!({
            "email": "patient@example.com",
            "password": "password123"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], user.id.to_string());
    assert_eq!(body["user"]["role"], "PATIENT");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_login_with_bad_password_is_unauthorized() {
    let (app, identity) = create_test_app().await;
    seed_user(&identity).await;

    let response = app
        .oneshot(json_request("POST", "/login", json!({
            "email": "patient@example.com",
            "password": "not-the-password"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_me_requires_token() {
    let (app, _) = create_test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_profile() {
    let (app, identity) = create_test_app().await;
    let user = seed_user(&identity).await;
    let config = TestConfig::default();
    let principal = TestUser::with_id(user.id, &user.email, UserRole::Patient);

    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", JwtTestUtils::bearer(&principal, &config.jwt_secret))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "patient@example.com");
}

#[tokio::test]
async fn test_contact_update_rejects_role_field() {
    let (app, identity) = create_test_app().await;
    let user = seed_user(&identity).await;
    let config = TestConfig::default();
    let principal = TestUser::with_id(user.id, &user.email, UserRole::Patient);

    let mut request = json_request("PATCH", "/me/contact", json!({ "role": "ADMIN" }));
    request.headers_mut().insert(
        "authorization",
        JwtTestUtils::bearer(&principal, &config.jwt_secret).parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());

    let stored = identity.current_user(user.id).await.unwrap();
    assert_eq!(stored.role, UserRole::Patient);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(json_request("POST", "/forgot-password", json!({ "email": "ghost@example.com" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_verify_email_with_unknown_token_is_bad_request() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(json_request("POST", "/verify-email", json!({ "token": "nope" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
