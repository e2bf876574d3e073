use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PatientError;
use crate::models::Patient;

use super::PatientStore;

#[derive(Default)]
pub struct MemoryPatientStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl MemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientStore for MemoryPatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let mut patients = self.patients.write().await;
        if patients.values().any(|p| p.user_id == patient.user_id) {
            return Err(PatientError::AlreadyExists);
        }
        patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Patient>, PatientError> {
        Ok(self.patients.read().await.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Patient>, PatientError> {
        let patients = self.patients.read().await;
        Ok(ids.iter().filter_map(|id| patients.get(id).cloned()).collect())
    }
}
