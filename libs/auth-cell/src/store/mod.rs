use async_trait::async_trait;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::models::UserRecord;

mod memory;
mod supabase;

pub use memory::MemoryUserStore;
pub use supabase::SupabaseUserStore;

/// Persistence for user accounts. Emails are stored normalized, and the
/// store rejects a second account with the same email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, IdentityError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, IdentityError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, IdentityError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError>;

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError>;

    /// Writes every mutable column. `id`, `email`, `role` and `created_at`
    /// are never changed.
    async fn save(&self, user: &UserRecord) -> Result<UserRecord, IdentityError>;

    async fn delete(&self, id: Uuid) -> Result<(), IdentityError>;
}
