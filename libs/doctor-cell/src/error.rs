use thiserror::Error;

use auth_cell::IdentityError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Only doctors can perform this action")]
    NotADoctor,

    #[error("Doctor is not active")]
    Inactive,

    #[error("Doctor record already exists for this user")]
    AlreadyExists,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::NotADoctor => AppError::Forbidden(err.to_string()),
            DoctorError::Inactive | DoctorError::AlreadyExists => AppError::Conflict(err.to_string()),
            DoctorError::Identity(e) => e.into(),
            DoctorError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
