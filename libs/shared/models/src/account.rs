use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

pub const ACCOUNTS_TABLE: &str = "accounts";

/// A registered user. Stored as one row in `accounts`; the role decides which
/// of the optional attribute groups are meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,

    // Patient attributes
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub medical_history: Option<String>,
    pub emergency_contact: Option<String>,

    // Doctor attributes
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub consultation_fee: Option<f64>,
    pub follow_up_fee: Option<f64>,
    pub emergency_fee: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Account {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active_doctor(&self) -> bool {
        self.role == Role::Doctor && self.is_active
    }

    /// Name as shown to the other party of an appointment.
    pub fn display_name(&self) -> String {
        match self.role {
            Role::Doctor => format!("Dr. {}", self.full_name()),
            _ => self.full_name(),
        }
    }
}
