use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use shared_config::AppConfig;

use crate::models::UserRecord;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Hands freshly issued account tokens to the user. Delivery problems are
/// reported but never undo the operation that issued the token.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn email_verification(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError>;

    async fn password_reset(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError>;

    async fn doctor_invite(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError>;
}

/// Writes the links users would receive to the log. Used until a mail
/// transport is configured.
pub struct TracingNotifier {
    frontend_url: String,
}

impl TracingNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn link(&self, page: &str, token: &str) -> String {
        format!("{}/{}?token={}", self.frontend_url, page, token)
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn email_verification(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        info!(user_id = %user.id, "Verification link for {}: {}", user.email, self.link("verify-email", token));
        Ok(())
    }

    async fn password_reset(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        info!(user_id = %user.id, "Password reset link for {}: {}", user.email, self.link("reset-password", token));
        Ok(())
    }

    async fn doctor_invite(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        info!(user_id = %user.id, "Invite link for Dr. {}: {}", user.last_name, self.link("reset-password", token));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    EmailVerification,
    PasswordReset,
    DoctorInvite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub email: String,
    pub token: String,
}

/// Keeps every notice in memory so callers can pick the tokens up.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.notices.lock().await.clone()
    }

    /// Most recent token of `kind` sent to `email`.
    pub async fn last_token(&self, kind: NoticeKind, email: &str) -> Option<String> {
        self.notices
            .lock()
            .await
            .iter()
            .rev()
            .find(|notice| notice.kind == kind && notice.email == email)
            .map(|notice| notice.token.clone())
    }

    async fn record(&self, kind: NoticeKind, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        self.notices.lock().await.push(Notice {
            kind,
            email: user.email.clone(),
            token: token.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn email_verification(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        self.record(NoticeKind::EmailVerification, user, token).await
    }

    async fn password_reset(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        self.record(NoticeKind::PasswordReset, user, token).await
    }

    async fn doctor_invite(&self, user: &UserRecord, token: &str) -> Result<(), NotifyError> {
        self.record(NoticeKind::DoctorInvite, user, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_point_at_the_frontend() {
        let config = AppConfig {
            frontend_url: "https://clinic.example.com/".to_string(),
            ..AppConfig::default()
        };
        let notifier = TracingNotifier::new(&config);

        assert_eq!(
            notifier.link("verify-email", "abc"),
            "https://clinic.example.com/verify-email?token=abc"
        );
    }
}
