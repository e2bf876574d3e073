use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use clinic_api::router::create_router;
use auth_cell::{NoticeKind, RecordingNotifier};
use clinic_api::services::Services;
use shared_config::AppConfig;
use shared_utils::clock::SystemClock;

struct TestApi {
    app: Router,
    services: Services,
    notifier: Arc<RecordingNotifier>,
}

fn create_test_api() -> TestApi {
    let config = Arc::new(AppConfig {
        jwt_secret: "api-test-secret".to_string(),
        ..AppConfig::default()
    });
    let notifier = Arc::new(RecordingNotifier::new());
    let services = Services::build(&config, Arc::new(SystemClock), notifier.clone());
    TestApi {
        app: create_router(config, services.clone()),
        services,
        notifier,
    }
}

impl TestApi {
    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call("POST", "/auth/login", None, Some(json!({ "email": email, "password": password })))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

fn iso(t: chrono::DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[tokio::test]
async fn health_route_responds() {
    let api = create_test_api();
    let (status, body) = api.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn full_booking_flow() {
    let api = create_test_api();

    // Admin onboards a doctor
    api.services.identity.ensure_admin("admin@example.com", "admin-password").await.unwrap();
    let admin_token = api.login("admin@example.com", "admin-password").await;

    let (status, doctor) = api
        .call(
            "POST",
            "/doctors",
            Some(&admin_token),
            Some(json!({
                "email": "house@example.com",
                "first_name": "Gregory",
                "last_name": "House",
                "specialization": "Diagnostics"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let doctor_id = doctor["id"].as_str().unwrap().to_string();

    let (status, _) = api
        .call("PATCH", &format!("/doctors/{}/activate", doctor_id), Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // Doctor sets a password through the invite token
    let invite = api.notifier.last_token(NoticeKind::DoctorInvite, "house@example.com").await.unwrap();
    let (status, _) = api
        .call("POST", "/auth/reset-password", None, Some(json!({ "token": invite, "password": "diagnostics" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let doctor_token = api.login("house@example.com", "diagnostics").await;

    // Doctor publishes slots
    let start = Utc::now() + Duration::days(1);
    let (status, created) = api
        .call(
            "POST",
            "/appointments/slots",
            Some(&doctor_token),
            Some(json!({
                "slots": [
                    { "start_time": iso(start), "end_time": iso(start + Duration::minutes(30)) },
                    { "start_time": iso(start + Duration::minutes(30)), "end_time": iso(start + Duration::hours(1)) }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let slot_id = created[0]["id"].as_str().unwrap().to_string();

    // Patient signs up and books
    let (status, _) = api
        .call(
            "POST",
            "/patients/register",
            None,
            Some(json!({
                "email": "cuddy@example.com",
                "password": "administrator",
                "first_name": "Lisa",
                "last_name": "Cuddy"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let verification = api.notifier.last_token(NoticeKind::EmailVerification, "cuddy@example.com").await.unwrap();
    let (status, _) = api
        .call("POST", "/auth/verify-email", None, Some(json!({ "token": verification })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let patient_token = api.login("cuddy@example.com", "administrator").await;

    let uri = format!(
        "/appointments/available?doctor_id={}&after={}&before={}",
        doctor_id,
        iso(Utc::now()),
        iso(Utc::now() + Duration::days(7))
    );
    let (status, available) = api.call("GET", &uri, Some(&patient_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available.as_array().unwrap().len(), 2);

    let (status, booked) = api
        .call("POST", &format!("/appointments/slots/{}/book", slot_id), Some(&patient_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booked["status"], "BOOKED");

    let (_, available) = api.call("GET", &uri, Some(&patient_token), None).await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    let (status, cancelled) = api
        .call("POST", &format!("/appointments/slots/{}/cancel", slot_id), Some(&patient_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "AVAILABLE");
}

#[tokio::test]
async fn doctor_listing_is_admin_only() {
    let api = create_test_api();

    let (status, _) = api
        .call(
            "POST",
            "/patients/register",
            None,
            Some(json!({
                "email": "cuddy@example.com",
                "password": "administrator",
                "first_name": "Lisa",
                "last_name": "Cuddy"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let patient_token = api.login("cuddy@example.com", "administrator").await;

    let (status, _) = api.call("GET", "/doctors", Some(&patient_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, active) = api.call("GET", "/doctors/active", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, json!([]));
}
