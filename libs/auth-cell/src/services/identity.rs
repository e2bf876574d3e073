use std::sync::{Arc, LazyLock};

use chrono::Duration;
use regex::Regex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::UserRole;
use shared_utils::clock::Clock;
use shared_utils::jwt::issue_token;

use crate::error::IdentityError;
use crate::models::{
    LoginResponse, NewUser, UpdateContactRequest, UpdateIdentityRequest, UserProfile, UserRecord,
};
use crate::services::notifier::{Notifier, NotifyError};
use crate::services::password::PasswordService;
use crate::services::tokens::generate_token;
use crate::store::UserStore;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub const VERIFICATION_TOKEN_HOURS: i64 = 24;
pub const RESET_TOKEN_HOURS: i64 = 1;

/// Trims, lower-cases and checks the shape of an email address.
pub fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(IdentityError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

fn required(field: &str, value: &str) -> Result<String, IdentityError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Logs a failed notice. The token stays stored so the user can ask again.
pub fn log_undelivered(user_id: Uuid, notice: &str, result: Result<(), NotifyError>) {
    if let Err(e) = result {
        warn!("Could not deliver {} to {}: {}", notice, user_id, e);
    }
}

pub struct IdentityService {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    jwt_secret: String,
    jwt_lifetime: Duration,
}

impl IdentityService {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            jwt_secret: config.jwt_secret.clone(),
            jwt_lifetime: Duration::hours(config.jwt_expiry_hours),
        }
    }

    /// Sends the pending verification token to the account owner.
    pub async fn send_verification(&self, user: &UserRecord) {
        if let Some(token) = &user.email_verification_token {
            log_undelivered(user.id, "verification", self.notifier.email_verification(user, token).await);
        }
    }

    /// Creates an account with an unverified email and a fresh
    /// verification token.
    #[instrument(skip(self, new_user), fields(role = %new_user.role))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, IdentityError> {
        let email = normalize_email(&new_user.email)?;
        let first_name = required("First name", &new_user.first_name)?;
        let last_name = required("Last name", &new_user.last_name)?;
        PasswordService::validate(&new_user.password)?;

        if self.store.find_by_email(&email).await?.is_some() {
            info!("Email already registered");
            return Err(IdentityError::EmailAlreadyExists);
        }

        let now = self.clock.now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email,
            password_hash: PasswordService::hash_password(&new_user.password)?,
            first_name,
            last_name,
            phone_number: new_user.phone_number,
            address: new_user.address,
            date_of_birth: new_user.date_of_birth,
            gender: new_user.gender,
            role: new_user.role,
            is_email_verified: false,
            email_verification_token: Some(generate_token()),
            email_verification_expires: Some(now + Duration::hours(VERIFICATION_TOKEN_HOURS)),
            verified_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.store.insert(record).await?;
        info!("Created {} account {}", user.role, user.id);
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, IdentityError> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.store.find_by_email(&email).await? else {
            info!("Login attempt with unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        if !PasswordService::verify_password(password, &user.password_hash)? {
            info!("Login attempt with invalid password for {}", user.id);
            return Err(IdentityError::InvalidCredentials);
        }

        let token = issue_token(
            user.id,
            &user.email,
            user.role,
            &self.jwt_secret,
            self.clock.now(),
            self.jwt_lifetime,
        )
        .map_err(IdentityError::Signing)?;

        info!("Login successful for {}", user.id);
        Ok(LoginResponse { user: UserProfile::from(&user), token })
    }

    pub async fn find_user(&self, id: Uuid) -> Result<UserRecord, IdentityError> {
        self.store.find_by_id(id).await?.ok_or(IdentityError::NotFound)
    }

    pub async fn current_user(&self, id: Uuid) -> Result<UserProfile, IdentityError> {
        Ok(UserProfile::from(self.find_user(id).await?))
    }

    /// Batch lookup for read joins. Unknown ids are skipped.
    pub async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, IdentityError> {
        self.store.find_many(ids).await
    }

    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<UserProfile, IdentityError> {
        let now = self.clock.now();

        let mut user = self.store
            .find_by_verification_token(token)
            .await?
            .filter(|user| !user.is_email_verified)
            .filter(|user| user.email_verification_expires.is_some_and(|expires| expires > now))
            .ok_or_else(|| {
                info!("Invalid or expired verification token");
                IdentityError::InvalidToken
            })?;

        user.is_email_verified = true;
        user.verified_at = Some(now);
        user.email_verification_token = None;
        user.email_verification_expires = None;
        user.updated_at = now;

        let saved = self.store.save(&user).await?;
        info!("Email verified for {}", saved.id);
        Ok(UserProfile::from(saved))
    }

    /// Issues a new verification token. Unknown and already verified
    /// addresses are ignored so the endpoint does not reveal accounts.
    #[instrument(skip(self, email))]
    pub async fn resend_verification(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim().to_lowercase();

        let Some(mut user) = self.store.find_by_email(&email).await? else {
            debug!("No account for resend request, skipping");
            return Ok(());
        };

        if user.is_email_verified {
            debug!("Email already verified, skipping resend");
            return Ok(());
        }

        let now = self.clock.now();
        let token = generate_token();
        user.email_verification_token = Some(token.clone());
        user.email_verification_expires = Some(now + Duration::hours(VERIFICATION_TOKEN_HOURS));
        user.updated_at = now;

        let user = self.store.save(&user).await?;
        info!("Verification token reissued for {}", user.id);
        log_undelivered(user.id, "verification", self.notifier.email_verification(&user, &token).await);
        Ok(())
    }

    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), IdentityError> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.store.find_by_email(&email).await? else {
            debug!("No account for password reset request, skipping");
            return Ok(());
        };

        let token = self.issue_password_reset(user.id, Duration::hours(RESET_TOKEN_HOURS)).await?;
        log_undelivered(user.id, "password reset", self.notifier.password_reset(&user, &token).await);
        Ok(())
    }

    /// Stores a reset token valid for `validity` and returns it.
    pub async fn issue_password_reset(&self, user_id: Uuid, validity: Duration) -> Result<String, IdentityError> {
        let mut user = self.find_user(user_id).await?;
        let now = self.clock.now();
        let token = generate_token();

        user.password_reset_token = Some(token.clone());
        user.password_reset_expires = Some(now + validity);
        user.updated_at = now;

        self.store.save(&user).await?;
        info!("Password reset token issued for {}", user.id);
        Ok(token)
    }

    #[instrument(skip(self, token, password))]
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), IdentityError> {
        PasswordService::validate(password)?;
        let now = self.clock.now();

        let mut user = self.store
            .find_by_reset_token(token)
            .await?
            .filter(|user| user.password_reset_expires.is_some_and(|expires| expires > now))
            .ok_or(IdentityError::InvalidToken)?;

        user.password_hash = PasswordService::hash_password(password)?;
        user.password_reset_token = None;
        user.password_reset_expires = None;
        user.updated_at = now;

        self.store.save(&user).await?;
        info!("Password reset for {}", user.id);
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn update_contact(&self, id: Uuid, request: UpdateContactRequest) -> Result<UserProfile, IdentityError> {
        let mut user = self.find_user(id).await?;

        if let Some(phone_number) = request.phone_number {
            user.phone_number = Some(phone_number);
        }
        if let Some(address) = request.address {
            user.address = Some(address);
        }
        if let Some(date_of_birth) = request.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
        if let Some(gender) = request.gender {
            user.gender = Some(gender);
        }
        user.updated_at = self.clock.now();

        Ok(UserProfile::from(self.store.save(&user).await?))
    }

    #[instrument(skip(self, request))]
    pub async fn update_identity(&self, id: Uuid, request: UpdateIdentityRequest) -> Result<UserProfile, IdentityError> {
        let mut user = self.find_user(id).await?;

        if let Some(first_name) = request.first_name {
            user.first_name = required("First name", &first_name)?;
        }
        if let Some(last_name) = request.last_name {
            user.last_name = required("Last name", &last_name)?;
        }
        if let Some(password) = request.password {
            PasswordService::validate(&password)?;
            user.password_hash = PasswordService::hash_password(&password)?;
        }
        user.updated_at = self.clock.now();

        Ok(UserProfile::from(self.store.save(&user).await?))
    }

    /// Creates the bootstrap admin unless an account with that email exists.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<UserRecord, IdentityError> {
        let normalized = normalize_email(email)?;

        if let Some(existing) = self.store.find_by_email(&normalized).await? {
            if existing.role != UserRole::Admin {
                warn!("Bootstrap admin email belongs to a {} account", existing.role);
            }
            return Ok(existing);
        }

        let mut admin = self
            .create_user(NewUser {
                email: normalized,
                password: password.to_string(),
                first_name: "System".to_string(),
                last_name: "Administrator".to_string(),
                phone_number: None,
                address: None,
                date_of_birth: None,
                gender: None,
                role: UserRole::Admin,
            })
            .await?;

        let now = self.clock.now();
        admin.is_email_verified = true;
        admin.verified_at = Some(now);
        admin.email_verification_token = None;
        admin.email_verification_expires = None;
        admin.updated_at = now;

        let admin = self.store.save(&admin).await?;
        info!("Bootstrap admin {} created", admin.id);
        Ok(admin)
    }

    /// Removes an account. Only used to undo a half-finished registration.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        warn!("Deleting user {}", id);
        self.store.delete(id).await
    }
}
