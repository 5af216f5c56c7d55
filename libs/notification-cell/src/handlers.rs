use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{NotificationListQuery, NotificationListResponse, UpdateNotificationsRequest};
use crate::services::notification::NotificationService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): WithRejection<Query<NotificationListQuery>, AppError>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let service = NotificationService::new(&config);
    let response = service.list_notifications(user.id, &params).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn update_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateNotificationsRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = NotificationService::new(&config);
    let affected = service
        .apply_action(user.id, request.action, &request.notification_ids)
        .await?;

    Ok(Json(json!({
        "success": true,
        "action": request.action,
        "affected": affected
    })))
}
