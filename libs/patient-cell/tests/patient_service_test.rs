use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use auth_cell::{IdentityError, IdentityService, MemoryUserStore, NoticeKind, RecordingNotifier, UserStore};
use patient_cell::models::RegisterPatientRequest;
use patient_cell::router::patient_routes;
use patient_cell::{MemoryPatientStore, PatientError, PatientService};
use shared_models::auth::UserRole;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct Fixture {
    patients: Arc<PatientService>,
    users: Arc<MemoryUserStore>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture() -> Fixture {
    let users = Arc::new(MemoryUserStore::new());
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let notifier = Arc::new(RecordingNotifier::new());
    let identity = Arc::new(IdentityService::new(
        &TestConfig::default().to_app_config(),
        users.clone(),
        clock.clone(),
        notifier.clone(),
    ));
    let patients = Arc::new(PatientService::new(Arc::new(MemoryPatientStore::new()), identity, clock));
    Fixture { patients, users, notifier }
}

fn registration(email: &str) -> RegisterPatientRequest {
    RegisterPatientRequest {
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: "Pat".to_string(),
        last_name: "Smith".to_string(),
        phone_number: Some("555-0100".to_string()),
        address: None,
        date_of_birth: None,
        gender: None,
    }
}

#[tokio::test]
async fn register_creates_patient_user_and_record() {
    let f = fixture();

    let profile = f.patients.register_patient(registration("pat@example.com")).await.unwrap();
    assert_eq!(profile.email, "pat@example.com");
    assert!(!profile.is_email_verified);

    let user = f.users.find_by_id(profile.user_id).await.unwrap().unwrap();
    assert_eq!(user.role, UserRole::Patient);

    let sent = f.notifier.last_token(NoticeKind::EmailVerification, "pat@example.com").await;
    assert_eq!(sent, user.email_verification_token);
    assert!(sent.is_some());

    let patient = f.patients.assert_is_patient(profile.user_id).await.unwrap();
    assert_eq!(patient.id, profile.id);
}

#[tokio::test]
async fn register_twice_fails() {
    let f = fixture();
    f.patients.register_patient(registration("pat@example.com")).await.unwrap();

    assert_matches!(
        f.patients.register_patient(registration("PAT@example.com")).await,
        Err(PatientError::Identity(IdentityError::EmailAlreadyExists))
    );
}

#[tokio::test]
async fn non_patients_are_rejected() {
    let f = fixture();
    assert_matches!(f.patients.assert_is_patient(Uuid::new_v4()).await, Err(PatientError::NotAPatient));
    assert_matches!(f.patients.find_patient(Uuid::new_v4()).await, Err(PatientError::NotFound));
}

#[tokio::test]
async fn contacts_join_identity() {
    let f = fixture();
    let profile = f.patients.register_patient(registration("pat@example.com")).await.unwrap();

    let contacts = f.patients.patient_contacts(&[profile.id]).await.unwrap();
    let contact = &contacts[&profile.id];
    assert_eq!(contact.email, "pat@example.com");
    assert_eq!(contact.phone_number.as_deref(), Some("555-0100"));
}

#[tokio::test]
async fn test_register_and_me_endpoints() {
    let f = fixture();
    let config = TestConfig::default();
    let app = patient_routes(config.to_arc(), f.patients.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "email": "pat@example.com",
            "password": "password123",
            "first_name": "Pat",
            "last_name": "Smith"
        }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let created: Value = serde_json::from_slice(&body).unwrap();
    let user_id: Uuid = created["user_id"].as_str().unwrap().parse().unwrap();

    let principal = TestUser::with_id(user_id, "pat@example.com", UserRole::Patient);
    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", JwtTestUtils::bearer(&principal, &config.jwt_secret))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_rejects_role_field() {
    let f = fixture();
    let app = patient_routes(TestConfig::default().to_arc(), f.patients.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "email": "pat@example.com",
            "password": "password123",
            "first_name": "Pat",
            "last_name": "Smith",
            "role": "ADMIN"
        }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert!(f.users.find_by_email("pat@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_short_password_is_bad_request() {
    let f = fixture();
    let app = patient_routes(TestConfig::default().to_arc(), f.patients.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "email": "pat@example.com",
            "password": "short",
            "first_name": "Pat",
            "last_name": "Smith"
        }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
