use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::error::PatientError;
use crate::models::Patient;

use super::PatientStore;

const PATIENTS: &str = "/rest/v1/patients";

pub struct SupabasePatientStore {
    supabase: SupabaseClient,
}

impl SupabasePatientStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn find_one(&self, filter: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("{}?{}", PATIENTS, filter);
        let rows: Vec<Patient> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        debug!("Inserting patient {} for user {}", patient.id, patient.user_id);

        let body = serde_json::to_value(&patient).map_err(DatabaseError::from)?;
        let result: Result<Vec<Patient>, DatabaseError> = self.supabase
            .request_with_headers(
                Method::POST,
                PATIENTS,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => rows.into_iter().next().ok_or(PatientError::NotFound),
            Err(e) if e.is_unique_violation() => Err(PatientError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        self.find_one(&format!("id=eq.{}", id)).await
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Patient>, PatientError> {
        self.find_one(&format!("user_id=eq.{}", user_id)).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Patient>, PatientError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("{}?id=in.({})", PATIENTS, list);
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }
}
