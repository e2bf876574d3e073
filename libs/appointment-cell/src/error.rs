use thiserror::Error;
use uuid::Uuid;

use auth_cell::IdentityError;
use doctor_cell::DoctorError;
use patient_cell::PatientError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

/// Rule a slot batch or a query range broke. Indices refer to the
/// position in the submitted batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotValidationError {
    #[error("At least one slot is required")]
    EmptyBatch,

    #[error("At most {max} slots can be created at once, got {actual}")]
    BatchTooLarge { max: usize, actual: usize },

    #[error("Slot {index}: start time must be in the future")]
    StartNotInFuture { index: usize },

    #[error("Slot {index}: end time must be after start time")]
    EndNotAfterStart { index: usize },

    #[error("Slots {first} and {second} overlap each other")]
    OverlapsWithinBatch { first: usize, second: usize },

    #[error("\"after\" must be earlier than \"before\"")]
    InvalidRange,

    #[error("\"before\" must be within {max_days} days from now")]
    RangeExceedsHorizon { max_days: i64 },

    #[error("Query window may span at most {max_days} days")]
    WindowTooWide { max_days: i64 },
}

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Validation error: {0}")]
    Validation(#[from] SlotValidationError),

    #[error("Slot overlaps an existing slot{}", describe_conflict(.conflicting_slot))]
    Overlap { conflicting_slot: Option<Uuid> },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Patient already has an upcoming appointment with this doctor")]
    AlreadyHasAppointment,

    #[error("Doctor is not active")]
    DoctorInactive,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

fn describe_conflict(conflicting_slot: &Option<Uuid>) -> String {
    conflicting_slot
        .map(|id| format!(" ({})", id))
        .unwrap_or_default()
}

impl SlotError {
    pub fn slot_not_found() -> Self {
        SlotError::NotFound("Slot")
    }
}

impl From<DoctorError> for SlotError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => SlotError::NotFound("Doctor"),
            DoctorError::NotADoctor => SlotError::Forbidden(err.to_string()),
            DoctorError::Inactive => SlotError::DoctorInactive,
            DoctorError::AlreadyExists => SlotError::Conflict(err.to_string()),
            DoctorError::Identity(e) => e.into(),
            DoctorError::Database(e) => SlotError::Database(e),
        }
    }
}

impl From<PatientError> for SlotError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => SlotError::NotFound("Patient"),
            PatientError::NotAPatient => SlotError::Forbidden(err.to_string()),
            PatientError::AlreadyExists => SlotError::Conflict(err.to_string()),
            PatientError::Identity(e) => e.into(),
            PatientError::Database(e) => SlotError::Database(e),
        }
    }
}

impl From<IdentityError> for SlotError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound => SlotError::NotFound("User"),
            IdentityError::Database(e) => SlotError::Database(e),
            other => SlotError::Internal(other.to_string()),
        }
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::Validation(e) => AppError::ValidationError(e.to_string()),
            SlotError::NotFound(_) => AppError::NotFound(err.to_string()),
            SlotError::Forbidden(msg) => AppError::Forbidden(msg),
            SlotError::Overlap { .. }
            | SlotError::AlreadyHasAppointment
            | SlotError::DoctorInactive => AppError::Conflict(err.to_string()),
            SlotError::Conflict(msg) => AppError::Conflict(msg),
            SlotError::Internal(msg) => AppError::Internal(msg),
            SlotError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
