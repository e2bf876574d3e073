use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    AvailableQuery, AvailableSlot, CreateSlotsRequest, DoctorSlotView, PatientSlotView, RangeQuery,
    SlotUpdate, SlotView,
};
use crate::services::SlotService;

// ==============================================================================
// SHARED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn available_slots(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<AvailableSlot>>, AppError> {
    debug!("{} {} browsing availability of doctor {}", user.role, user.id, query.doctor_id);
    Ok(Json(slots.available(query.doctor_id, query.after, query.before).await?))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slots(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotsRequest>,
) -> Result<(StatusCode, Json<Vec<SlotView>>), AppError> {
    require_role(&user, UserRole::Doctor)?;
    let created = slots.create_slots(&user, request.slots).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_my_slots(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<DoctorSlotView>>, AppError> {
    require_role(&user, UserRole::Doctor)?;
    Ok(Json(slots.list_doctor_slots(&user, range.after, range.before).await?))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, UserRole::Doctor)?;
    slots.delete_slot(&user, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_bookings(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<PatientSlotView>>, AppError> {
    require_role(&user, UserRole::Patient)?;
    Ok(Json(slots.list_patient_bookings(&user, range.after, range.before).await?))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    require_role(&user, UserRole::Patient)?;
    Ok(Json(slots.book_slot(&user, slot_id).await?))
}

#[axum::debug_handler]
pub async fn cancel_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    require_role(&user, UserRole::Patient)?;
    Ok(Json(slots.cancel_slot(&user, slot_id).await?))
}

#[axum::debug_handler]
pub async fn reserve_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    require_role(&user, UserRole::Patient)?;
    Ok(Json(slots.reserve_slot(&user, slot_id).await?))
}

#[axum::debug_handler]
pub async fn release_reservation(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    require_role(&user, UserRole::Patient)?;
    Ok(Json(slots.release_reservation(&user, slot_id).await?))
}

// ==============================================================================
// SHARED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotView>, AppError> {
    Ok(Json(slots.get_slot(&user, slot_id).await?))
}

/// The accepted body fields depend on the caller's role.
#[axum::debug_handler]
pub async fn update_slot(
    State(slots): State<Arc<SlotService>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<SlotView>, AppError> {
    let update = SlotUpdate::from_json(user.role, body).map_err(|e| {
        debug!("Rejected {} slot update: {}", user.role, e);
        AppError::BadRequest(format!("Invalid update for {} role: {}", user.role, e))
    })?;

    Ok(Json(slots.update_slot(&user, slot_id, update).await?))
}
