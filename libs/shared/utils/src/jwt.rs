use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use shared_models::account::Account;
use shared_models::auth::{AuthUser, JwtClaims};

pub fn issue_token(account: &Account, jwt_secret: &str, expiry_hours: i64) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: account.id.to_string(),
        email: account.email.clone(),
        role: account.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| format!("Failed to sign token: {}", e))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<AuthUser, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Token rejected: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token expired".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
            _ => "Invalid token".to_string(),
        }
    })?;

    let user = AuthUser::try_from(data.claims)?;

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};
    use shared_models::auth::Role;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_issued_token_validates() {
        let account = TestUser::doctor("doc@example.com").to_account();
        let token = issue_token(&account, SECRET, 1).unwrap();

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, account.id);
        assert_eq!(user.role, Role::Doctor);
        assert_eq!(user.email, "doc@example.com");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_expired_token(&user, SECRET);

        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_invalid_signature_token(&user);

        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Invalid token signature");
    }

    #[test]
    fn test_malformed_and_empty_secret() {
        assert!(validate_token(&JwtTestUtils::create_malformed_token(), SECRET).is_err());
        assert_eq!(validate_token("a.b.c", "").unwrap_err(), "JWT secret is not set");
    }
}
