use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::error::IdentityError;
use crate::models::UserRecord;

use super::UserStore;

const USERS: &str = "/rest/v1/users";

pub struct SupabaseUserStore {
    supabase: SupabaseClient,
}

impl SupabaseUserStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn find_one(&self, filter: &str) -> Result<Option<UserRecord>, IdentityError> {
        let path = format!("{}?{}&limit=1", USERS, filter);
        let rows: Vec<UserRecord> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl UserStore for SupabaseUserStore {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, IdentityError> {
        debug!("Inserting user {}", user.id);

        let body = serde_json::to_value(&user).map_err(DatabaseError::from)?;
        let result: Result<Vec<UserRecord>, DatabaseError> = self.supabase
            .request_with_headers(
                Method::POST,
                USERS,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows.into_iter().next().ok_or(IdentityError::NotFound),
            Err(e) if e.is_unique_violation() => Err(IdentityError::EmailAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, IdentityError> {
        self.find_one(&format!("id=eq.{}", id)).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, IdentityError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("{}?id=in.({})", USERS, list);
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let normalized = email.trim().to_lowercase();
        self.find_one(&format!("email=eq.{}", urlencoding::encode(&normalized))).await
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError> {
        self.find_one(&format!("email_verification_token=eq.{}", urlencoding::encode(token))).await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError> {
        self.find_one(&format!("password_reset_token=eq.{}", urlencoding::encode(token))).await
    }

    async fn save(&self, user: &UserRecord) -> Result<UserRecord, IdentityError> {
        let body = json!({
            "password_hash": user.password_hash,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "phone_number": user.phone_number,
            "address": user.address,
            "date_of_birth": user.date_of_birth,
            "gender": user.gender,
            "is_email_verified": user.is_email_verified,
            "email_verification_token": user.email_verification_token,
            "email_verification_expires": user.email_verification_expires,
            "verified_at": user.verified_at,
            "password_reset_token": user.password_reset_token,
            "password_reset_expires": user.password_reset_expires,
            "updated_at": user.updated_at,
        });

        let path = format!("{}?id=eq.{}", USERS, user.id);
        let rows: Vec<UserRecord> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;

        rows.into_iter().next().ok_or(IdentityError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), IdentityError> {
        let path = format!("{}?id=eq.{}", USERS, id);
        let _: Vec<UserRecord> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(())
    }
}
