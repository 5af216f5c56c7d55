use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/book", post(handlers::book_appointment))
        .route("/cancel", delete(handlers::cancel_appointment))
        .route("/cancel-doctor", post(handlers::doctor_cancel_appointment))
        .route("/fees/{doctor_id}", get(handlers::get_doctor_fees))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
