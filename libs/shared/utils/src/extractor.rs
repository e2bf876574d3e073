use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use tracing::debug;

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Resolves the bearer token into a [`User`] and stores it in the request
/// extensions for the handlers behind this layer.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.jwt_secret)
        .map_err(AppError::Auth)?;

    debug!("Authenticated {} as {}", user.id, user.role);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects callers whose role differs from `role`.
pub fn require_role(user: &User, role: UserRole) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden(format!("Requires {} role", role)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: UserRole) -> User {
        User { id: Uuid::new_v4(), email: "u@example.com".into(), role, issued_at: None }
    }

    #[test]
    fn require_role_matches_exactly() {
        assert!(require_role(&user(UserRole::Admin), UserRole::Admin).is_ok());
        assert!(matches!(
            require_role(&user(UserRole::Doctor), UserRole::Admin),
            Err(AppError::Forbidden(_))
        ));
    }
}
