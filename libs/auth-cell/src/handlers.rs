use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::{extract::WithRejection, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::account::Account;
use shared_models::auth::{AuthUser, TokenResponse};
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};

use crate::models::{AuthError, AuthResponse, LoginRequest, RegisterRequest};
use crate::services::account::AccountService;

fn token_for(account: &Account, config: &AppConfig) -> Result<String, AppError> {
    issue_token(account, &config.jwt_secret, config.jwt_expiry_hours)
        .map_err(|e| AuthError::Token(e).into())
}

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let service = AccountService::new(&config);
    let account = service.register(request).await?;
    let token = token_for(&account, &config)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, account })))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AccountService::new(&config);
    let account = service.authenticate(&request.email, &request.password).await?;
    let token = token_for(&account, &config)?;

    Ok(Json(AuthResponse { token, account }))
}

#[axum::debug_handler]
pub async fn validate(
    State(config): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let TypedHeader(auth) = auth.ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;
    let user = validate_token(auth.token(), &config.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id.to_string(),
        email: user.email,
        role: user.role,
    }))
}

#[axum::debug_handler]
pub async fn verify(
    State(config): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<Value> {
    let valid = auth
        .map(|TypedHeader(auth)| validate_token(auth.token(), &config.jwt_secret).is_ok())
        .unwrap_or(false);

    Json(json!({ "valid": valid }))
}

#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Account>, AppError> {
    let service = AccountService::new(&config);
    Ok(Json(service.find_by_id(user.id).await?))
}
