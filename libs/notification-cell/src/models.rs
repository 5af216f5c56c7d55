use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::auth::Role;
use shared_models::error::AppError;

pub const NOTIFICATIONS_TABLE: &str = "notifications";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    AppointmentBooked,
    AppointmentCancelled,
    AppointmentRescheduled,
    AppointmentCompleted,
    AppointmentNoShow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub data: Value,
}

impl NewNotification {
    pub fn to_row(&self) -> Value {
        json!({
            "accountId": self.account_id,
            "title": self.title,
            "message": self.message,
            "notificationType": self.notification_type,
            "priority": self.priority,
            "isRead": false,
            "data": self.data,
            "createdAt": Utc::now().to_rfc3339(),
        })
    }
}

/// Appointment lifecycle events that produce notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentEvent {
    Booked,
    CancelledByPatient { reason: Option<String> },
    CancelledByDoctor { reason: String },
    Rescheduled { by: Role, previous_date: NaiveDate, previous_time: String },
    Completed,
    NoShow,
}

/// The parties and slot of the appointment an event refers to.
#[derive(Debug, Clone)]
pub struct AppointmentParties {
    pub appointment_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationAction {
    MarkAsRead,
    MarkAsUnread,
    Delete,
    MarkAllAsRead,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationsRequest {
    #[serde(default)]
    pub notification_ids: Vec<Uuid>,
    pub action: NotificationAction,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::ValidationError(msg) => AppError::ValidationError(msg),
            NotificationError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
