use tracing::debug;

use shared_models::account::Account;

use crate::models::{AppointmentType, FeeQuote};

/// Fee lookup for a doctor's appointment types. Each type reads one of the
/// doctor's configured fees and falls back to a clinic default when that fee
/// is unset. Zero is a valid fee.
pub struct PricingService;

impl PricingService {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_fee(&self, appointment_type: AppointmentType, doctor: &Account) -> f64 {
        let configured = match appointment_type {
            AppointmentType::Consultation | AppointmentType::RoutineCheckup => doctor.consultation_fee,
            AppointmentType::FollowUp => doctor.follow_up_fee,
            AppointmentType::Emergency => doctor.emergency_fee,
        };

        let fee = configured
            .filter(|fee| fee.is_finite() && *fee >= 0.0)
            .unwrap_or_else(|| self.default_fee(appointment_type));

        debug!("Fee for {:?} with doctor {}: {:.2}", appointment_type, doctor.id, fee);
        fee
    }

    pub fn default_fee(&self, appointment_type: AppointmentType) -> f64 {
        match appointment_type {
            AppointmentType::Consultation | AppointmentType::RoutineCheckup => 100.0,
            AppointmentType::FollowUp => 75.0,
            AppointmentType::Emergency => 200.0,
        }
    }

    /// Every appointment type with the fee this doctor would charge.
    pub fn fee_table(&self, doctor: &Account) -> Vec<FeeQuote> {
        AppointmentType::ALL
            .iter()
            .map(|t| FeeQuote {
                appointment_type: *t,
                fee: self.calculate_fee(*t, doctor),
            })
            .collect()
    }
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new()
    }
}
