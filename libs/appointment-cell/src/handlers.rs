use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{AuthUser, Capability};
use shared_models::error::AppError;

use crate::models::{
    AppointmentListQuery, BookAppointmentRequest, CancelQuery, DoctorCancelRequest, RescheduleRequest,
    StatusUpdateRequest,
};
use crate::services::booking::AppointmentBookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<BookAppointmentRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require(Capability::BookAppointment)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.book_appointment(&user, request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    }))))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): WithRejection<Query<CancelQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::CancelAsPatient)?;

    let raw_id = params
        .id
        .ok_or_else(|| AppError::BadRequest("Appointment id is required".to_string()))?;
    let appointment_id = Uuid::parse_str(raw_id.trim())
        .map_err(|_| AppError::BadRequest("Invalid appointment id".to_string()))?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.cancel_by_patient(&user, appointment_id, params.reason).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn doctor_cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(request), _): WithRejection<Json<DoctorCancelRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::CancelAsDoctor)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.cancel_by_doctor(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled and patient notified"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(params), _): WithRejection<Query<AppointmentListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointments = service.list_appointments(&user, &params).await?;
    let total = appointments.len();

    Ok(Json(json!({
        "appointments": appointments,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointment = service.get_appointment(&user, appointment_id).await?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<RescheduleRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::RescheduleAppointment)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.reschedule_appointment(&user, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<StatusUpdateRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::UpdateAppointmentStatus)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.update_status(&user, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_fees(
    State(config): State<Arc<AppConfig>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let fees = service.doctor_fees(doctor_id).await?;

    Ok(Json(json!({
        "doctorId": doctor_id,
        "fees": fees
    })))
}
