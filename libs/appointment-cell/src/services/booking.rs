use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::{AppointmentEvent, AppointmentParties};
use notification_cell::NotificationFanout;
use shared_config::AppConfig;
use shared_database::{DatabaseError, Filter, Order, Query, SupabaseClient};
use shared_models::account::{Account, ACCOUNTS_TABLE};
use shared_models::auth::{AuthUser, Capability, Role};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, BookAppointmentRequest,
    CancelledBy, ConflictOutcome, DoctorCancelRequest, FeeQuote, RescheduleRequest, StatusUpdateRequest,
    APPOINTMENTS_TABLE, DOCTOR_SLOT_INDEX, PATIENT_SLOT_INDEX,
};
use crate::services::conflict::BookingConflictChecker;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::pricing::PricingService;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    conflict_checker: BookingConflictChecker,
    lifecycle: AppointmentLifecycleService,
    pricing: PricingService,
    fanout: NotificationFanout,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = SupabaseClient::new(config);

        Self {
            conflict_checker: BookingConflictChecker::with_client(supabase.clone()),
            supabase,
            lifecycle: AppointmentLifecycleService::new(),
            pricing: PricingService::new(),
            fanout: NotificationFanout::new(config),
        }
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    pub async fn book_appointment(
        &self,
        patient: &AuthUser,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking appointment for patient {} with doctor {}", patient.id, request.doctor_id);

        let time = self.lifecycle.parse_slot_time(&request.time)?;
        self.lifecycle.validate_future_slot(request.date, &time, Utc::now())?;

        let doctor = match self
            .conflict_checker
            .check(patient.id, request.doctor_id, request.date, &time, None)
            .await?
        {
            ConflictOutcome::Free(doctor) => doctor,
            ConflictOutcome::DoctorNotFound => return Err(AppointmentError::DoctorNotFound),
            ConflictOutcome::PatientConflict => return Err(AppointmentError::PatientConflict),
            ConflictOutcome::DoctorConflict => return Err(AppointmentError::DoctorConflict),
        };

        // Tokens outlive deactivation
        self.ensure_active_account(patient.id).await?;

        let fee = self.pricing.calculate_fee(request.appointment_type, &doctor);
        let now = Utc::now().to_rfc3339();

        let row = json!({
            "patientId": patient.id,
            "doctorId": doctor.id,
            "date": request.date,
            "time": time,
            "status": AppointmentStatus::Scheduled,
            "appointmentType": request.appointment_type,
            "fee": fee,
            "notes": request.notes,
            "symptoms": request.symptoms,
            "createdAt": now,
            "updatedAt": now,
        });

        let appointment: Appointment = self
            .supabase
            .insert(APPOINTMENTS_TABLE, row)
            .await
            .map_err(slot_write_error)?;

        info!("Appointment {} booked for patient {} with doctor {} on {} {}",
              appointment.id, patient.id, doctor.id, appointment.date, appointment.time);

        self.notify(&AppointmentEvent::Booked, &appointment).await;

        Ok(appointment)
    }

    // ==============================================================================
    // CANCELLATION
    // ==============================================================================

    pub async fn cancel_by_patient(
        &self,
        patient: &AuthUser,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_by_id(appointment_id).await?;

        if appointment.patient_id != patient.id {
            return Err(AppointmentError::Unauthorized(
                "Only the patient who booked this appointment can cancel it".to_string(),
            ));
        }

        self.lifecycle.validate_cancellation(&appointment, Utc::now())?;

        let reason = reason.filter(|r| !r.trim().is_empty());
        let cancelled = self.mark_cancelled(&appointment, CancelledBy::Patient, reason.clone()).await?;

        self.notify(&AppointmentEvent::CancelledByPatient { reason }, &cancelled).await;

        Ok(cancelled)
    }

    pub async fn cancel_by_doctor(
        &self,
        doctor: &AuthUser,
        request: DoctorCancelRequest,
    ) -> Result<Appointment, AppointmentError> {
        let reason = request.cancellation_reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppointmentError::ValidationError(
                "Cancellation reason is required".to_string(),
            ));
        }

        let appointment = self.get_by_id(request.appointment_id).await?;

        if appointment.doctor_id != doctor.id {
            return Err(AppointmentError::Unauthorized(
                "Only the assigned doctor can cancel this appointment".to_string(),
            ));
        }

        self.lifecycle.validate_cancellation(&appointment, Utc::now())?;

        let cancelled = self
            .mark_cancelled(&appointment, CancelledBy::Doctor, Some(reason.clone()))
            .await?;

        self.notify(&AppointmentEvent::CancelledByDoctor { reason }, &cancelled).await;

        Ok(cancelled)
    }

    /// The update only matches while the row is still active, so a cancel that
    /// loses a race against another cancel reports it as already cancelled.
    async fn mark_cancelled(
        &self,
        appointment: &Appointment,
        by: CancelledBy,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now().to_rfc3339();
        let patch = json!({
            "status": AppointmentStatus::Cancelled,
            "cancelledBy": by,
            "cancellationReason": reason,
            "cancelledAt": now,
            "updatedAt": now,
        });

        let updated: Vec<Appointment> = self
            .supabase
            .update(&active_row(appointment.id), patch)
            .await?;

        let cancelled = updated.into_iter().next().ok_or(AppointmentError::AlreadyCancelled)?;
        info!("Appointment {} cancelled by {}", cancelled.id, by);

        Ok(cancelled)
    }

    // ==============================================================================
    // RESCHEDULE AND STATUS
    // ==============================================================================

    pub async fn reschedule_appointment(
        &self,
        user: &AuthUser,
        appointment_id: Uuid,
        request: RescheduleRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_by_id(appointment_id).await?;

        let owns = match user.role {
            Role::Patient => appointment.patient_id == user.id,
            Role::Doctor => appointment.doctor_id == user.id,
            Role::Admin => false,
        };
        if !owns {
            return Err(AppointmentError::Unauthorized(
                "Only the patient or doctor of this appointment can reschedule it".to_string(),
            ));
        }

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Rescheduled)?;

        let time = self.lifecycle.parse_slot_time(&request.time)?;
        self.lifecycle.validate_future_slot(request.date, &time, Utc::now())?;

        match self
            .conflict_checker
            .check(appointment.patient_id, appointment.doctor_id, request.date, &time, Some(appointment.id))
            .await?
        {
            ConflictOutcome::Free(_) => {}
            ConflictOutcome::DoctorNotFound => return Err(AppointmentError::DoctorNotFound),
            ConflictOutcome::PatientConflict => return Err(AppointmentError::PatientConflict),
            ConflictOutcome::DoctorConflict => return Err(AppointmentError::DoctorConflict),
        }

        let patch = json!({
            "date": request.date,
            "time": time,
            "status": AppointmentStatus::Rescheduled,
            "updatedAt": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Appointment> = self
            .supabase
            .update(&active_row(appointment.id), patch)
            .await
            .map_err(slot_write_error)?;

        let moved = updated
            .into_iter()
            .next()
            .ok_or(AppointmentError::InvalidStatusTransition(appointment.status))?;

        info!("Appointment {} moved from {} {} to {} {}",
              moved.id, appointment.date, appointment.time, moved.date, moved.time);

        let event = AppointmentEvent::Rescheduled {
            by: user.role,
            previous_date: appointment.date,
            previous_time: appointment.time.clone(),
        };
        self.notify(&event, &moved).await;

        Ok(moved)
    }

    pub async fn update_status(
        &self,
        doctor: &AuthUser,
        appointment_id: Uuid,
        request: StatusUpdateRequest,
    ) -> Result<Appointment, AppointmentError> {
        let event = match request.status {
            AppointmentStatus::Completed => AppointmentEvent::Completed,
            AppointmentStatus::NoShow => AppointmentEvent::NoShow,
            other => {
                return Err(AppointmentError::ValidationError(format!(
                    "Status can only be set to completed or no-show, got {}",
                    other
                )))
            }
        };

        let appointment = self.get_by_id(appointment_id).await?;

        if appointment.doctor_id != doctor.id {
            return Err(AppointmentError::Unauthorized(
                "Only the assigned doctor can update this appointment".to_string(),
            ));
        }

        self.lifecycle.validate_status_transition(appointment.status, request.status)?;

        let patch = json!({
            "status": request.status,
            "updatedAt": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Appointment> = self
            .supabase
            .update(&active_row(appointment.id), patch)
            .await?;

        let changed = updated
            .into_iter()
            .next()
            .ok_or(AppointmentError::InvalidStatusTransition(appointment.status))?;

        info!("Appointment {} marked {}", changed.id, changed.status);
        self.notify(&event, &changed).await;

        Ok(changed)
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    pub async fn get_appointment(&self, user: &AuthUser, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_by_id(appointment_id).await?;

        if !user.role.can(Capability::ViewAllAppointments) && !appointment.is_participant(user.id) {
            return Err(AppointmentError::Unauthorized(
                "Not authorized to view this appointment".to_string(),
            ));
        }

        Ok(appointment)
    }

    /// Patients and doctors see their own appointments; admins see all.
    pub async fn list_appointments(
        &self,
        user: &AuthUser,
        params: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let scope = match user.role {
            _ if user.role.can(Capability::ViewAllAppointments) => None,
            Role::Doctor => Some(Filter::eq("doctorId", user.id)),
            Role::Patient | Role::Admin => Some(Filter::eq("patientId", user.id)),
        };

        let mut query = Query::table(APPOINTMENTS_TABLE)
            .filter_opt(scope)
            .filter_opt(params.status.map(|s| Filter::eq("status", s)))
            .limit(params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .offset(params.offset.unwrap_or(0));

        if params.upcoming {
            query = query
                .filter(Filter::gte("date", Utc::now().date_naive()))
                .order(Order::Asc("date"))
                .order(Order::Asc("time"));
            if params.status.is_none() {
                query = query.filter(Filter::any_of("status", AppointmentStatus::ACTIVE));
            }
        } else {
            query = query.order(Order::Desc("date")).order(Order::Desc("time"));
        }

        let appointments: Vec<Appointment> = self.supabase.select(&query).await?;
        debug!("Found {} appointments for {} {}", appointments.len(), user.role, user.id);

        Ok(appointments)
    }

    /// Fees the doctor charges per appointment type.
    pub async fn doctor_fees(&self, doctor_id: Uuid) -> Result<Vec<FeeQuote>, AppointmentError> {
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", doctor_id));
        let doctor: Option<Account> = self.supabase.select_one(&query).await?;

        match doctor {
            Some(doctor) if doctor.is_active_doctor() => Ok(self.pricing.fee_table(&doctor)),
            _ => Err(AppointmentError::DoctorNotFound),
        }
    }

    async fn ensure_active_account(&self, account_id: Uuid) -> Result<(), AppointmentError> {
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", account_id));
        let account: Option<Account> = self.supabase.select_one(&query).await?;

        match account {
            Some(account) if account.is_active => Ok(()),
            _ => {
                warn!("Booking refused for inactive or missing account {}", account_id);
                Err(AppointmentError::AccountInactive)
            }
        }
    }

    async fn get_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let query = Query::table(APPOINTMENTS_TABLE).filter(Filter::eq("id", appointment_id));

        self.supabase
            .select_one(&query)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    // ==============================================================================
    // NOTIFICATIONS
    // ==============================================================================

    async fn notify(&self, event: &AppointmentEvent, appointment: &Appointment) {
        let parties = self.load_parties(appointment).await;
        let written = self.fanout.dispatch(event, &parties).await;
        debug!("{} notifications written for appointment {}", written, appointment.id);
    }

    async fn load_parties(&self, appointment: &Appointment) -> AppointmentParties {
        let query = Query::table(ACCOUNTS_TABLE)
            .filter(Filter::any_of("id", [appointment.patient_id, appointment.doctor_id]));

        let accounts: Vec<Account> = match self.supabase.select(&query).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Could not load parties of appointment {}: {}", appointment.id, e);
                Vec::new()
            }
        };

        let name_of = |id: Uuid, fallback: &str| {
            accounts
                .iter()
                .find(|a| a.id == id)
                .map(Account::display_name)
                .unwrap_or_else(|| fallback.to_string())
        };

        AppointmentParties {
            appointment_id: appointment.id,
            date: appointment.date,
            time: appointment.time.clone(),
            patient_id: appointment.patient_id,
            patient_name: name_of(appointment.patient_id, "Your patient"),
            doctor_id: appointment.doctor_id,
            doctor_name: name_of(appointment.doctor_id, "your doctor"),
        }
    }
}

fn active_row(appointment_id: Uuid) -> Query {
    Query::table(APPOINTMENTS_TABLE)
        .filter(Filter::eq("id", appointment_id))
        .filter(Filter::any_of("status", AppointmentStatus::ACTIVE))
}

/// Unique slot indexes reject a write that lost the check-then-write race.
fn slot_write_error(err: DatabaseError) -> AppointmentError {
    match err {
        DatabaseError::Conflict(message) if message.contains(PATIENT_SLOT_INDEX) => {
            warn!("Patient slot write rejected by storage: {}", message);
            AppointmentError::PatientConflict
        }
        DatabaseError::Conflict(message) if message.contains(DOCTOR_SLOT_INDEX) => {
            warn!("Doctor slot write rejected by storage: {}", message);
            AppointmentError::DoctorConflict
        }
        other => AppointmentError::DatabaseError(other),
    }
}
