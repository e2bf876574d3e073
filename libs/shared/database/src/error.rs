use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `exclusion_violation`.
pub const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Exclusion constraint violated: {0}")]
    ExclusionViolation(String),

    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DatabaseError {
    /// Builds the error for a non-2xx PostgREST response, classifying
    /// constraint violations by their SQLSTATE.
    pub fn from_api(status: u16, code: Option<String>, message: String) -> Self {
        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => DatabaseError::UniqueViolation(message),
            Some(EXCLUSION_VIOLATION) => DatabaseError::ExclusionViolation(message),
            _ => DatabaseError::Api { status, code, message },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            DatabaseError::Api { code, .. } => code.as_deref(),
            DatabaseError::UniqueViolation(_) => Some(UNIQUE_VIOLATION),
            DatabaseError::ExclusionViolation(_) => Some(EXCLUSION_VIOLATION),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }

    pub fn is_exclusion_violation(&self) -> bool {
        matches!(self, DatabaseError::ExclusionViolation(_))
    }
}
