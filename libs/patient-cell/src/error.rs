use thiserror::Error;

use auth_cell::IdentityError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Only patients can perform this action")]
    NotAPatient,

    #[error("Patient record already exists for this user")]
    AlreadyExists,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::NotAPatient => AppError::Forbidden(err.to_string()),
            PatientError::AlreadyExists => AppError::Conflict(err.to_string()),
            PatientError::Identity(e) => e.into(),
            PatientError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
