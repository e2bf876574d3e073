use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

fn client_for(server: &MockServer) -> SupabaseClient {
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_service_key: "service-key".to_string(),
        ..AppConfig::default()
    };
    SupabaseClient::new(&config)
}

#[tokio::test]
async fn sends_service_key_and_decodes_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("active", "eq.true"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "d1" }])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/doctors?active=eq.true", None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "d1");
}

#[tokio::test]
async fn exclusion_violation_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_slots"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23P01",
            "message": "conflicting key value violates exclusion constraint \"appointment_slots_no_overlap\"",
            "details": null,
            "hint": null
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Result<Vec<Value>, DatabaseError> = client
        .request_with_headers(
            Method::POST,
            "/rest/v1/appointment_slots",
            Some(json!([])),
            Some(SupabaseClient::representation_headers()),
        )
        .await;

    assert_matches!(result, Err(DatabaseError::ExclusionViolation(msg)) if msg.contains("appointment_slots_no_overlap"));
}

#[tokio::test]
async fn rpc_error_keeps_custom_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment_slot"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "AP001",
            "message": "patient already has an upcoming appointment with this doctor"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Result<Vec<Value>, DatabaseError> = client
        .rpc("book_appointment_slot", json!({ "p_slot_id": "x" }))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.code(), Some("AP001"));
    assert_matches!(err, DatabaseError::Api { status: 400, .. });
}

#[tokio::test]
async fn plain_text_errors_are_preserved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Result<Vec<Value>, DatabaseError> = client
        .request(Method::GET, "/rest/v1/users", None)
        .await;

    assert_matches!(result, Err(DatabaseError::Api { status: 503, code: None, message }) if message == "upstream unavailable");
}
