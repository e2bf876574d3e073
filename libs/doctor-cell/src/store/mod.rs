use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DoctorError;
use crate::models::Doctor;

mod memory;
mod supabase;

pub use memory::MemoryDoctorStore;
pub use supabase::SupabaseDoctorStore;

#[async_trait]
pub trait DoctorStore: Send + Sync {
    /// Fails with `AlreadyExists` when the user already has a doctor record.
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Doctor>, DoctorError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Doctor>, DoctorError>;

    async fn list(&self, active_only: bool) -> Result<Vec<Doctor>, DoctorError>;

    /// Returns `None` when no doctor has this id.
    async fn set_active(&self, id: Uuid, active: bool, now: DateTime<Utc>) -> Result<Option<Doctor>, DoctorError>;

    async fn set_specialization(
        &self,
        id: Uuid,
        specialization: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Doctor>, DoctorError>;
}
