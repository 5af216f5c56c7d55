use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::models::{slot_start, Appointment, AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition(current_status));
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
                AppointmentStatus::Rescheduled,
            ],
            // Terminal
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => vec![],
        }
    }

    /// Normalizes a 24h "HH:MM" slot time.
    pub fn parse_slot_time(&self, time: &str) -> Result<String, AppointmentError> {
        let trimmed = time.trim();
        let well_formed = trimmed.len() == 5 && trimmed.as_bytes()[2] == b':';
        match NaiveTime::parse_from_str(trimmed, "%H:%M") {
            Ok(parsed) if well_formed => Ok(parsed.format("%H:%M").to_string()),
            _ => Err(AppointmentError::InvalidTime(format!(
                "Invalid time '{}', expected HH:MM",
                time
            ))),
        }
    }

    /// A new or moved slot must start after `now`.
    pub fn validate_future_slot(
        &self,
        date: NaiveDate,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        let starts_at = slot_start(date, time)
            .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid time '{}', expected HH:MM", time)))?;

        if starts_at <= now {
            return Err(AppointmentError::InvalidTime(
                "Cannot book an appointment in the past".to_string(),
            ));
        }

        Ok(())
    }

    /// State and timing rules shared by patient and doctor cancellations.
    pub fn validate_cancellation(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        match appointment.status {
            AppointmentStatus::Cancelled => return Err(AppointmentError::AlreadyCancelled),
            AppointmentStatus::Completed | AppointmentStatus::NoShow => {
                return Err(AppointmentError::InvalidStatusTransition(appointment.status));
            }
            AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled => {}
        }

        match appointment.starts_at() {
            Some(starts_at) if starts_at > now => Ok(()),
            _ => Err(AppointmentError::InvalidTime(
                "Cannot cancel past appointments".to_string(),
            )),
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
