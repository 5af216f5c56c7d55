use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Filter, Query, SupabaseClient};
use shared_models::account::{Account, ACCOUNTS_TABLE};

use crate::models::{AppointmentError, AppointmentStatus, ConflictOutcome, APPOINTMENTS_TABLE};

/// Decides whether a (patient, doctor, date, time) slot can be taken.
pub struct BookingConflictChecker {
    supabase: SupabaseClient,
}

impl BookingConflictChecker {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn with_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    /// Runs the doctor lookup, then the patient slot, then the doctor slot.
    /// `exclude` leaves one appointment out of both slot queries so a move
    /// does not collide with itself.
    pub async fn check(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude: Option<Uuid>,
    ) -> Result<ConflictOutcome, AppointmentError> {
        debug!("Checking slot {} {} for patient {} with doctor {}", date, time, patient_id, doctor_id);

        let doctor_query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", doctor_id));
        let doctor: Option<Account> = self.supabase.select_one(&doctor_query).await?;

        let doctor = match doctor {
            Some(account) if account.is_active_doctor() => account,
            _ => {
                warn!("Doctor {} not found or inactive", doctor_id);
                return Ok(ConflictOutcome::DoctorNotFound);
            }
        };

        if self.slot_taken("patientId", patient_id, date, time, exclude).await? {
            warn!("Patient {} already has an appointment at {} {}", patient_id, date, time);
            return Ok(ConflictOutcome::PatientConflict);
        }

        if self.slot_taken("doctorId", doctor_id, date, time, exclude).await? {
            warn!("Doctor {} already has an appointment at {} {}", doctor_id, date, time);
            return Ok(ConflictOutcome::DoctorConflict);
        }

        Ok(ConflictOutcome::Free(Box::new(doctor)))
    }

    async fn slot_taken(
        &self,
        party_column: &'static str,
        party_id: Uuid,
        date: NaiveDate,
        time: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        let query = Query::table(APPOINTMENTS_TABLE)
            .filter(Filter::eq(party_column, party_id))
            .filter(Filter::eq("date", date))
            .filter(Filter::eq("time", time))
            .filter(Filter::any_of("status", AppointmentStatus::ACTIVE))
            .filter_opt(exclude.map(|id| Filter::neq("id", id)));

        Ok(self.supabase.exists(&query).await?)
    }
}
