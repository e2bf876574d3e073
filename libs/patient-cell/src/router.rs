use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::PatientService;

pub fn patient_routes(config: Arc<AppConfig>, patients: Arc<PatientService>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register_patient));

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_current_patient))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(patients)
}
