use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PatientError;
use crate::models::Patient;

mod memory;
mod supabase;

pub use memory::MemoryPatientStore;
pub use supabase::SupabasePatientStore;

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Patient>, PatientError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Patient>, PatientError>;
}
