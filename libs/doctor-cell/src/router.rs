use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::DoctorService;

pub fn doctor_routes(config: Arc<AppConfig>, doctors: Arc<DoctorService>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/active", get(handlers::list_active_doctors));

    // Protected routes; admin-only handlers check the role themselves
    let protected_routes = Router::new()
        .route("/", get(handlers::list_doctors).post(handlers::create_doctor))
        .route("/me", get(handlers::get_current_doctor))
        .route("/{doctor_id}", patch(handlers::update_doctor))
        .route("/{doctor_id}/activate", patch(handlers::activate_doctor))
        .route("/{doctor_id}/inactivate", patch(handlers::inactivate_doctor))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(doctors)
}
