use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailAlreadyExists => AppError::Conflict(err.to_string()),
            IdentityError::InvalidCredentials => AppError::Auth(err.to_string()),
            IdentityError::NotFound => AppError::NotFound(err.to_string()),
            IdentityError::InvalidToken => AppError::BadRequest(err.to_string()),
            IdentityError::Validation(msg) => AppError::ValidationError(msg),
            IdentityError::Hashing(msg) | IdentityError::Signing(msg) => AppError::Internal(msg),
            IdentityError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
