use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;

use crate::models::{
    AppointmentEvent, AppointmentParties, NewNotification, NotificationPriority, NotificationType,
    NOTIFICATIONS_TABLE,
};

/// Writes the notifications that follow an appointment change.
pub struct NotificationFanout {
    supabase: SupabaseClient,
}

impl NotificationFanout {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Writes one notification per affected party and returns how many were
    /// stored. A failed write is logged and reported as zero; the appointment
    /// change that triggered it stands either way.
    pub async fn dispatch(&self, event: &AppointmentEvent, parties: &AppointmentParties) -> usize {
        let notifications = build_notifications(event, parties);
        if notifications.is_empty() {
            return 0;
        }

        debug!("Fanning out {} notifications for appointment {}",
               notifications.len(), parties.appointment_id);

        let rows = notifications.iter().map(NewNotification::to_row).collect();

        match self.supabase.insert_many(NOTIFICATIONS_TABLE, rows).await {
            Ok(written) => {
                info!("Stored {} notifications for appointment {}", written, parties.appointment_id);
                written
            }
            Err(e) => {
                warn!("Failed to store notifications for appointment {}: {}", parties.appointment_id, e);
                0
            }
        }
    }
}

/// Role-appropriate notification texts for an event.
pub fn build_notifications(event: &AppointmentEvent, parties: &AppointmentParties) -> Vec<NewNotification> {
    let slot = format!("{} at {}", parties.date.format("%Y-%m-%d"), parties.time);
    let payload = json!({
        "appointmentId": parties.appointment_id,
        "date": parties.date,
        "time": parties.time,
    });

    let to_patient = |title: &str, message: String, kind: NotificationType, priority: NotificationPriority| {
        NewNotification {
            account_id: parties.patient_id,
            title: title.to_string(),
            message,
            notification_type: kind,
            priority,
            data: payload.clone(),
        }
    };
    let to_doctor = |title: &str, message: String, kind: NotificationType, priority: NotificationPriority| {
        NewNotification {
            account_id: parties.doctor_id,
            title: title.to_string(),
            message,
            notification_type: kind,
            priority,
            data: payload.clone(),
        }
    };

    match event {
        AppointmentEvent::Booked => vec![
            to_doctor(
                "New appointment booked",
                format!("{} booked an appointment with you on {}", parties.patient_name, slot),
                NotificationType::AppointmentBooked,
                NotificationPriority::High,
            ),
            to_patient(
                "Appointment confirmed",
                format!("Your appointment with {} on {} is confirmed", parties.doctor_name, slot),
                NotificationType::AppointmentBooked,
                NotificationPriority::Medium,
            ),
        ],
        AppointmentEvent::CancelledByPatient { reason } => {
            let mut message = format!("{} cancelled the appointment on {}", parties.patient_name, slot);
            if let Some(reason) = reason.as_deref().filter(|r| !r.trim().is_empty()) {
                message.push_str(&format!(". Reason: {}", reason));
            }
            vec![to_doctor(
                "Appointment cancelled",
                message,
                NotificationType::AppointmentCancelled,
                NotificationPriority::High,
            )]
        }
        AppointmentEvent::CancelledByDoctor { reason } => vec![to_patient(
            "Appointment cancelled by doctor",
            format!("{} cancelled your appointment on {}. Reason: {}", parties.doctor_name, slot, reason),
            NotificationType::AppointmentCancelled,
            NotificationPriority::High,
        )],
        AppointmentEvent::Rescheduled { by, previous_date, previous_time } => {
            let previous = format!("{} at {}", previous_date.format("%Y-%m-%d"), previous_time);
            let doctor_note = || to_doctor(
                "Appointment rescheduled",
                format!("{} moved the appointment from {} to {}", parties.patient_name, previous, slot),
                NotificationType::AppointmentRescheduled,
                NotificationPriority::Medium,
            );
            let patient_note = || to_patient(
                "Appointment rescheduled",
                format!("Your appointment with {} moved from {} to {}", parties.doctor_name, previous, slot),
                NotificationType::AppointmentRescheduled,
                NotificationPriority::Medium,
            );

            match by {
                Role::Patient => vec![doctor_note()],
                Role::Doctor => vec![patient_note()],
                Role::Admin => vec![doctor_note(), patient_note()],
            }
        }
        AppointmentEvent::Completed => vec![to_patient(
            "Appointment completed",
            format!("Your appointment with {} on {} has been marked as completed", parties.doctor_name, slot),
            NotificationType::AppointmentCompleted,
            NotificationPriority::Low,
        )],
        AppointmentEvent::NoShow => vec![to_patient(
            "Missed appointment",
            format!("You were marked as a no-show for your appointment with {} on {}", parties.doctor_name, slot),
            NotificationType::AppointmentNoShow,
            NotificationPriority::Medium,
        )],
    }
}
