use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::account::Account;
use shared_models::error::AppError;

pub const APPOINTMENTS_TABLE: &str = "appointments";

// Partial unique indexes from migrations/0001_init.sql
pub const DOCTOR_SLOT_INDEX: &str = "appointments_active_doctor_slot_key";
pub const PATIENT_SLOT_INDEX: &str = "appointments_active_patient_slot_key";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub fee: f64,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Start of the slot. Slots are stored as a calendar date plus "HH:MM"
    /// and read as UTC.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        slot_start(self.date, &self.time)
    }

    pub fn is_participant(&self, account_id: Uuid) -> bool {
        self.patient_id == account_id || self.doctor_id == account_id
    }
}

pub fn slot_start(date: NaiveDate, time: &str) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
    Some(NaiveDateTime::new(date, time).and_utc())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that hold a slot.
    pub const ACTIVE: [AppointmentStatus; 2] = [AppointmentStatus::Scheduled, AppointmentStatus::Rescheduled];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
            AppointmentStatus::Rescheduled => "rescheduled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Emergency,
    RoutineCheckup,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 4] = [
        AppointmentType::Consultation,
        AppointmentType::FollowUp,
        AppointmentType::Emergency,
        AppointmentType::RoutineCheckup,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Patient,
    Doctor,
}

impl fmt::Display for CancelledBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelledBy::Patient => write!(f, "patient"),
            CancelledBy::Doctor => write!(f, "doctor"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "type", alias = "appointmentType", default)]
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
}

/// Query string of `DELETE /appointments/cancel`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelQuery {
    pub id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorCancelRequest {
    pub appointment_id: Uuid,
    #[serde(default)]
    pub cancellation_reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub appointment_type: AppointmentType,
    pub fee: f64,
}

/// Result of checking a requested slot against existing bookings.
#[derive(Debug, Clone)]
pub enum ConflictOutcome {
    Free(Box<Account>),
    DoctorNotFound,
    PatientConflict,
    DoctorConflict,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found or inactive")]
    DoctorNotFound,

    #[error("You already have an appointment at this date and time")]
    PatientConflict,

    #[error("Doctor is not available at the requested time")]
    DoctorConflict,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Invalid status transition from {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("{0}")]
    InvalidTime(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::PatientConflict
            | AppointmentError::DoctorConflict
            | AppointmentError::AlreadyCancelled => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatusTransition(_) | AppointmentError::InvalidTime(_) => {
                AppError::BadRequest(err.to_string())
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
            AppointmentError::AccountInactive => AppError::Forbidden(err.to_string()),
            AppointmentError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
