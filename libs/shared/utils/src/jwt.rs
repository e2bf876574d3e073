use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{JwtClaims, JwtHeader, User, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Signs an HS256 token for the given identity.
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    jwt_secret: &str,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    let header_json = serde_json::to_string(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_string(&claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let header: JwtHeader = URL_SAFE_NO_PAD.decode(header_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| "Invalid token header".to_string())?;
    if header.alg != "HS256" {
        debug!("Rejecting token signed with {}", header.alg);
        return Err("Unsupported token algorithm".to_string());
    }

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signature_string = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signature_string.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => bytes,
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_slice(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        },
    };

    let now = Utc::now().timestamp();
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| "Invalid token subject".to_string())?;

    let user = User {
        id,
        email: claims.email,
        role: claims.role,
        issued_at: Utc.timestamp_opt(claims.iat, 0).single(),
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn issued_token_validates() {
        let id = Uuid::new_v4();
        let token = issue_token(id, "doc@example.com", UserRole::Doctor, SECRET, Utc::now(), Duration::hours(1)).unwrap();

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, UserRole::Doctor);
        assert!(user.issued_at.is_some());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(3);
        let token = issue_token(Uuid::new_v4(), "p@example.com", UserRole::Patient, SECRET, issued, Duration::hours(1)).unwrap();

        assert_eq!(validate_token(&token, SECRET), Err("Token expired".to_string()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), "p@example.com", UserRole::Patient, SECRET, Utc::now(), Duration::hours(1)).unwrap();

        assert_eq!(validate_token(&token, "another-secret"), Err("Invalid token signature".to_string()));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(validate_token("not-a-token", SECRET).is_err());
        assert!(validate_token("a.b.c", SECRET).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        assert!(issue_token(Uuid::new_v4(), "a@example.com", UserRole::Admin, "", Utc::now(), Duration::hours(1)).is_err());
    }
}
