use std::sync::Arc;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_models::auth::{User, UserRole};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            storage_backend: StorageBackend::Memory,
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", UserRole::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn with_id(id: Uuid, email: &str, role: UserRole) -> Self {
        Self { id, email: email.to_string(), role }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            issued_at: Some(Utc::now()),
        }
    }
}

/// Signs fixture tokens with the production signer.
pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn token_valid_for(user: &TestUser, secret: &str, lifetime: Duration) -> String {
        issue_token(user.id, &user.email, user.role, secret, Utc::now(), lifetime)
            .expect("fixture secret is not empty")
    }

    pub fn expired_token(user: &TestUser, secret: &str) -> String {
        Self::token_valid_for(user, secret, Duration::hours(-1))
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::token_valid_for(user, secret, Duration::hours(24)))
    }
}

/// PostgREST-shaped rows for wiremock fixtures.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(id: Uuid, user_id: Uuid, active: bool) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "specialization": "General Practice",
            "active": active,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn slot_row(id: Uuid, doctor_id: Uuid, start: &str, end: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctor_id": doctor_id,
            "patient_id": null,
            "start_time": start,
            "end_time": end,
            "booked_at": null,
            "reason": null,
            "patient_notes": null,
            "doctor_notes": null,
            "video_call": null,
            "reserved_by": null,
            "reserved_until": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
