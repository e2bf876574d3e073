use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::IdentityService;

pub fn auth_routes(config: Arc<AppConfig>, identity: Arc<IdentityService>) -> Router {
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/verify-email", post(handlers::verify_email))
        .route("/resend-verification", post(handlers::resend_verification))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/me/contact", patch(handlers::update_contact))
        .route("/me/identity", patch(handlers::update_identity))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(identity)
}
