use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use tracing::instrument;

use crate::error::IdentityError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct PasswordService;

impl PasswordService {
    pub fn validate(password: &str) -> Result<(), IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, IdentityError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IdentityError::Hashing(e.to_string()))?;
        Ok(password_hash.to_string())
    }

    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, IdentityError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| IdentityError::Hashing(e.to_string()))?;
        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(IdentityError::Hashing(e.to_string())),
        }
    }
}
