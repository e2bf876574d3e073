use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DoctorError;
use crate::models::Doctor;

use super::DoctorStore;

#[derive(Default)]
pub struct MemoryDoctorStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl MemoryDoctorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DoctorStore for MemoryDoctorStore {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        let mut doctors = self.doctors.write().await;
        if doctors.values().any(|d| d.user_id == doctor.user_id) {
            return Err(DoctorError::AlreadyExists);
        }
        doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        Ok(self.doctors.read().await.values().find(|d| d.user_id == user_id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Doctor>, DoctorError> {
        let doctors = self.doctors.read().await;
        Ok(ids.iter().filter_map(|id| doctors.get(id).cloned()).collect())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Doctor>, DoctorError> {
        Ok(self.doctors
            .read()
            .await
            .values()
            .filter(|d| !active_only || d.active)
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: Uuid, active: bool, now: DateTime<Utc>) -> Result<Option<Doctor>, DoctorError> {
        let mut doctors = self.doctors.write().await;
        Ok(doctors.get_mut(&id).map(|doctor| {
            doctor.active = active;
            doctor.updated_at = now;
            doctor.clone()
        }))
    }

    async fn set_specialization(
        &self,
        id: Uuid,
        specialization: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Doctor>, DoctorError> {
        let mut doctors = self.doctors.write().await;
        Ok(doctors.get_mut(&id).map(|doctor| {
            doctor.specialization = specialization;
            doctor.updated_at = now;
            doctor.clone()
        }))
    }
}
