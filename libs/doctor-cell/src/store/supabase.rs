use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::error::DoctorError;
use crate::models::Doctor;

use super::DoctorStore;

const DOCTORS: &str = "/rest/v1/doctors";

pub struct SupabaseDoctorStore {
    supabase: SupabaseClient,
}

impl SupabaseDoctorStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn patch_one(&self, id: Uuid, body: Value) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("{}?id=eq.{}", DOCTORS, id);
        let rows: Vec<Doctor> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl DoctorStore for SupabaseDoctorStore {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        debug!("Inserting doctor {} for user {}", doctor.id, doctor.user_id);

        let body = serde_json::to_value(&doctor).map_err(DatabaseError::from)?;
        let result: Result<Vec<Doctor>, DatabaseError> = self.supabase
            .request_with_headers(
                Method::POST,
                DOCTORS,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows.into_iter().next().ok_or(DoctorError::NotFound),
            Err(e) if e.is_unique_violation() => Err(DoctorError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("{}?id=eq.{}", DOCTORS, id);
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("{}?user_id=eq.{}", DOCTORS, user_id);
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Doctor>, DoctorError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("{}?id=in.({})", DOCTORS, list);
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Doctor>, DoctorError> {
        let path = if active_only {
            format!("{}?active=eq.true", DOCTORS)
        } else {
            DOCTORS.to_string()
        };
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }

    async fn set_active(&self, id: Uuid, active: bool, now: DateTime<Utc>) -> Result<Option<Doctor>, DoctorError> {
        self.patch_one(id, json!({ "active": active, "updated_at": now })).await
    }

    async fn set_specialization(
        &self,
        id: Uuid,
        specialization: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Doctor>, DoctorError> {
        self.patch_one(id, json!({ "specialization": specialization, "updated_at": now })).await
    }
}
