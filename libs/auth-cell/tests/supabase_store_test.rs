use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use auth_cell::{IdentityError, SupabaseUserStore, UserRecord, UserStore};
use shared_database::SupabaseClient;
use shared_models::auth::UserRole;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(server: &MockServer) -> SupabaseUserStore {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    SupabaseUserStore::new(SupabaseClient::new(&config))
}

fn user_row(id: Uuid, email: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": email,
        "password_hash": "$argon2id$v=19$stub",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "phone_number": null,
        "address": null,
        "date_of_birth": "1990-12-10",
        "gender": null,
        "role": "DOCTOR",
        "is_email_verified": true,
        "email_verification_token": null,
        "email_verification_expires": null,
        "verified_at": "2024-01-01T00:00:00Z",
        "password_reset_token": null,
        "password_reset_expires": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn find_by_email_filters_on_normalized_address() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(id, "ada@example.com")])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let user = store.find_by_email(" Ada@Example.com ").await.unwrap().unwrap();

    assert_eq!(user.id, id);
    assert_eq!(user.role, UserRole::Doctor);
}

#[tokio::test]
async fn duplicate_insert_maps_to_email_exists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint \"users_email_key\"", "23505"),
        ))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let record: UserRecord = serde_json::from_value(user_row(Uuid::new_v4(), "ada@example.com")).unwrap();

    assert_matches!(store.insert(record).await, Err(IdentityError::EmailAlreadyExists));
}

#[tokio::test]
async fn save_of_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let mut record: UserRecord = serde_json::from_value(user_row(id, "ada@example.com")).unwrap();
    record.updated_at = Utc::now();

    assert_matches!(store.save(&record).await, Err(IdentityError::NotFound));
}

#[tokio::test]
async fn find_many_skips_request_for_empty_input() {
    let mock_server = MockServer::start().await;
    let store = store_for(&mock_server);

    assert!(store.find_many(&[]).await.unwrap().is_empty());
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}
