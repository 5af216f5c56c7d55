use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{DoctorCard, DoctorDirectoryQuery, ProfileResponse, UpdateProfileRequest};
use crate::services::profile::ProfileService;

#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let service = ProfileService::new(&config);
    Ok(Json(service.get_profile(user.id).await?))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<ProfileResponse>, AppError> {
    let service = ProfileService::new(&config);
    Ok(Json(service.update_profile(&user, request).await?))
}

#[axum::debug_handler]
pub async fn deactivate_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(&config);
    let account = service.deactivate(user.id).await?;

    Ok(Json(json!({
        "success": true,
        "accountId": account.id,
        "message": "Account deactivated"
    })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
    WithRejection(Query(params), _): WithRejection<Query<DoctorDirectoryQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(&config);
    let doctors = service.list_doctors(&params).await?;
    let total = doctors.len();

    Ok(Json(json!({
        "doctors": doctors,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<DoctorCard>, AppError> {
    let service = ProfileService::new(&config);
    Ok(Json(service.get_doctor(doctor_id).await?))
}
