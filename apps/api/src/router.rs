use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

use crate::services::Services;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "clinic-api" }))
}

pub fn create_router(config: Arc<AppConfig>, services: Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .route("/health", get(health))
        .nest("/auth", auth_routes(config.clone(), services.identity))
        .nest("/patients", patient_routes(config.clone(), services.patients))
        .nest("/doctors", doctor_routes(config.clone(), services.doctors))
        .nest("/appointments", appointment_routes(config, services.slots))
}
