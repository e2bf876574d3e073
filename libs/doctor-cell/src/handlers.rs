use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{CreateDoctorRequest, Doctor, DoctorProfile, DoctorSummary, UpdateDoctorRequest};
use crate::services::DoctorService;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_active_doctors(
    State(doctors): State<Arc<DoctorService>>,
) -> Result<Json<Vec<DoctorSummary>>, AppError> {
    Ok(Json(doctors.list_active_doctors().await?))
}

// ==============================================================================
// AUTHENTICATED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_current_doctor(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
) -> Result<Json<DoctorProfile>, AppError> {
    require_role(&user, UserRole::Doctor)?;
    Ok(Json(doctors.current_doctor(user.id).await?))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<DoctorProfile>>, AppError> {
    require_role(&user, UserRole::Admin)?;
    Ok(Json(doctors.list_doctors().await?))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<DoctorProfile>), AppError> {
    require_role(&user, UserRole::Admin)?;
    let doctor = doctors.create_doctor(request).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Doctor>, AppError> {
    require_role(&user, UserRole::Admin)?;
    Ok(Json(doctors.update_doctor(doctor_id, request).await?))
}

#[axum::debug_handler]
pub async fn activate_doctor(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Doctor>, AppError> {
    require_role(&user, UserRole::Admin)?;
    Ok(Json(doctors.activate_doctor(doctor_id).await?))
}

#[axum::debug_handler]
pub async fn inactivate_doctor(
    State(doctors): State<Arc<DoctorService>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Doctor>, AppError> {
    require_role(&user, UserRole::Admin)?;
    Ok(Json(doctors.deactivate_doctor(doctor_id).await?))
}
