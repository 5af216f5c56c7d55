use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::account::Account;
use shared_models::auth::Role;
use shared_models::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn default_role() -> Role {
    Role::Patient
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,

    // Required when registering as a doctor
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub account: Account,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Cannot register with role {0}")]
    RoleNotAllowed(Role),

    #[error("{0}")]
    ValidationError(String),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::AccountInactive => AppError::Forbidden(err.to_string()),
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::RoleNotAllowed(_) => AppError::BadRequest(err.to_string()),
            AuthError::ValidationError(msg) => AppError::ValidationError(msg),
            AuthError::AccountNotFound => AppError::NotFound(err.to_string()),
            AuthError::PasswordHash(msg) | AuthError::Token(msg) => AppError::Internal(msg),
            AuthError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_register_defaults_to_patient() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "a@example.com",
            "password": "longenough",
            "firstName": "A",
            "lastName": "B"
        }))
        .unwrap();
        assert_eq!(req.role, Role::Patient);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(AppError::from(AuthError::InvalidCredentials).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::AccountInactive).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(AuthError::EmailTaken).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::from(AuthError::RoleNotAllowed(Role::Admin)).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(AuthError::Token("bad key".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
