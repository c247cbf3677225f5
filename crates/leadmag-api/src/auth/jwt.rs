//! HS256 JWT verification
//!
//! Tokens are issued by the account system; this service only verifies them
//! and extracts the caller identity.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use leadmag_core::{AppError, AuthUser};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Validate and decode a bearer token into the authenticated caller.
pub fn validate_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token has expired".to_string())
            }
            _ => AppError::Unauthorized("Invalid or expired token".to_string()),
        }
    })?;

    let user_id = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

    Ok(AuthUser {
        user_id,
        email: token_data.claims.email,
    })
}

/// Issue a token for the given claims. Used by tests and local tooling.
pub fn issue_token(claims: &JwtClaims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-0123456789abcdef";

    fn claims_for(user_id: Uuid, exp_offset_secs: i64) -> JwtClaims {
        JwtClaims {
            sub: user_id.to_string(),
            email: "owner@example.com".to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        }
    }

    #[test]
    fn test_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(&claims_for(user_id, 3600), SECRET).unwrap();

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "owner@example.com");
    }

    #[test]
    fn test_rejects_expired_token() {
        let token = issue_token(&claims_for(Uuid::new_v4(), -3600), SECRET).unwrap();
        let err = validate_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = issue_token(&claims_for(Uuid::new_v4(), 3600), SECRET).unwrap();
        assert!(validate_token(&token, "another-secret-abcdef0123456789").is_err());
    }

    #[test]
    fn test_rejects_non_uuid_subject() {
        let claims = JwtClaims {
            sub: "not-a-uuid".to_string(),
            email: "owner@example.com".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = issue_token(&claims, SECRET).unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }
}
