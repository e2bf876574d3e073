use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest,
    UpdateContactRequest, UpdateIdentityRequest, UserProfile, VerifyEmailRequest,
};
use crate::services::IdentityService;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn login(
    State(identity): State<Arc<IdentityService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = identity.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn verify_email(
    State(identity): State<Arc<IdentityService>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    identity.verify_email(&request.token).await?;
    Ok(Json(MessageResponse::ok("Email verified successfully")))
}

#[axum::debug_handler]
pub async fn resend_verification(
    State(identity): State<Arc<IdentityService>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    identity.resend_verification(&request.email).await?;
    Ok(Json(MessageResponse::ok(
        "If the account exists and is unverified, a new verification link has been issued",
    )))
}

#[axum::debug_handler]
pub async fn forgot_password(
    State(identity): State<Arc<IdentityService>>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    identity.forgot_password(&request.email).await?;
    Ok(Json(MessageResponse::ok(
        "If the account exists, a password reset link has been issued",
    )))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(identity): State<Arc<IdentityService>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    identity.reset_password(&request.token, &request.password).await?;
    Ok(Json(MessageResponse::ok("Password has been reset")))
}

// ==============================================================================
// AUTHENTICATED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn me(
    State(identity): State<Arc<IdentityService>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserProfile>, AppError> {
    debug!("Getting profile for user: {}", user.id);
    Ok(Json(identity.current_user(user.id).await?))
}

#[axum::debug_handler]
pub async fn update_contact(
    State(identity): State<Arc<IdentityService>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateContactRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(identity.update_contact(user.id, request).await?))
}

#[axum::debug_handler]
pub async fn update_identity(
    State(identity): State<Arc<IdentityService>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateIdentityRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(identity.update_identity(user.id, request).await?))
}
