use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::models::UserRecord;

use super::UserStore;

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, IdentityError> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if taken || users.contains_key(&user.id) {
            return Err(IdentityError::EmailAlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, IdentityError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, IdentityError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, IdentityError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email_verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<UserRecord>, IdentityError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.password_reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save(&self, user: &UserRecord) -> Result<UserRecord, IdentityError> {
        let mut users = self.users.write().await;
        let stored = users.get_mut(&user.id).ok_or(IdentityError::NotFound)?;

        let updated = UserRecord {
            id: stored.id,
            email: stored.email.clone(),
            role: stored.role,
            created_at: stored.created_at,
            ..user.clone()
        };
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), IdentityError> {
        self.users.write().await.remove(&id);
        Ok(())
    }
}
