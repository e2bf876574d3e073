use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{PatientProfile, RegisterPatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn register_patient(
    State(patients): State<Arc<PatientService>>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<PatientProfile>), AppError> {
    let patient = patients.register_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn get_current_patient(
    State(patients): State<Arc<PatientService>>,
    Extension(user): Extension<User>,
) -> Result<Json<PatientProfile>, AppError> {
    Ok(Json(patients.current_patient(user.id).await?))
}
