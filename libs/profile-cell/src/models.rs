use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::account::Account;
use shared_models::auth::Role;
use shared_models::error::AppError;

/// Partial profile update. Absent fields are left untouched; identity fields
/// (email, role, activation) cannot be changed here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub profile_image_url: Option<String>,

    // Patient only
    pub blood_type: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub medical_history: Option<String>,
    pub emergency_contact: Option<String>,

    // Doctor only
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub consultation_fee: Option<f64>,
    pub follow_up_fee: Option<f64>,
    pub emergency_fee: Option<f64>,
}

impl UpdateProfileRequest {
    /// Wire names of the patient-only fields present in the request.
    pub fn patient_fields(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.blood_type.is_some() { present.push("bloodType"); }
        if self.allergies.is_some() { present.push("allergies"); }
        if self.medical_history.is_some() { present.push("medicalHistory"); }
        if self.emergency_contact.is_some() { present.push("emergencyContact"); }
        present
    }

    /// Wire names of the doctor-only fields present in the request.
    pub fn doctor_fields(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.specialization.is_some() { present.push("specialization"); }
        if self.license_number.is_some() { present.push("licenseNumber"); }
        if self.experience_years.is_some() { present.push("experienceYears"); }
        if self.qualifications.is_some() { present.push("qualifications"); }
        if self.bio.is_some() { present.push("bio"); }
        if self.consultation_fee.is_some() { present.push("consultationFee"); }
        if self.follow_up_fee.is_some() { present.push("followUpFee"); }
        if self.emergency_fee.is_some() { present.push("emergencyFee"); }
        present
    }

    pub fn validate(&self, role: Role) -> Result<(), ProfileError> {
        if role != Role::Patient {
            if let Some(field) = self.patient_fields().first() {
                return Err(ProfileError::FieldNotAllowed(field.to_string(), role));
            }
        }
        if role != Role::Doctor {
            if let Some(field) = self.doctor_fields().first() {
                return Err(ProfileError::FieldNotAllowed(field.to_string(), role));
            }
        }

        for (name, value) in [("firstName", &self.first_name), ("lastName", &self.last_name)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ProfileError::ValidationError(format!("{} cannot be empty", name)));
            }
        }

        if self.experience_years.is_some_and(|years| years < 0) {
            return Err(ProfileError::ValidationError("experienceYears cannot be negative".to_string()));
        }

        for (name, fee) in [
            ("consultationFee", self.consultation_fee),
            ("followUpFee", self.follow_up_fee),
            ("emergencyFee", self.emergency_fee),
        ] {
            if fee.is_some_and(|f| !f.is_finite() || f < 0.0) {
                return Err(ProfileError::ValidationError(format!("{} must be a non-negative amount", name)));
            }
        }

        Ok(())
    }

    /// Storage patch holding only the supplied fields.
    pub fn to_patch(&self) -> Value {
        let mut update_data = Map::new();

        let mut put = |column: &str, value: Value| {
            update_data.insert(column.to_string(), value);
        };

        if let Some(v) = &self.first_name { put("firstName", json!(v.trim())); }
        if let Some(v) = &self.last_name { put("lastName", json!(v.trim())); }
        if let Some(v) = &self.phone { put("phone", json!(v)); }
        if let Some(v) = &self.date_of_birth { put("dateOfBirth", json!(v)); }
        if let Some(v) = &self.gender { put("gender", json!(v)); }
        if let Some(v) = &self.address { put("address", json!(v)); }
        if let Some(v) = &self.profile_image_url { put("profileImageUrl", json!(v)); }
        if let Some(v) = &self.blood_type { put("bloodType", json!(v)); }
        if let Some(v) = &self.allergies { put("allergies", json!(v)); }
        if let Some(v) = &self.medical_history { put("medicalHistory", json!(v)); }
        if let Some(v) = &self.emergency_contact { put("emergencyContact", json!(v)); }
        if let Some(v) = &self.specialization { put("specialization", json!(v)); }
        if let Some(v) = &self.license_number { put("licenseNumber", json!(v)); }
        if let Some(v) = &self.experience_years { put("experienceYears", json!(v)); }
        if let Some(v) = &self.qualifications { put("qualifications", json!(v)); }
        if let Some(v) = &self.bio { put("bio", json!(v)); }
        if let Some(v) = &self.consultation_fee { put("consultationFee", json!(v)); }
        if let Some(v) = &self.follow_up_fee { put("followUpFee", json!(v)); }
        if let Some(v) = &self.emergency_fee { put("emergencyFee", json!(v)); }

        update_data.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
        Value::Object(update_data)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletion {
    pub percentage: u8,
    pub missing_fields: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Account,
    pub completion: ProfileCompletion,
}

/// Doctor details shown in the public directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorCard {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub consultation_fee: Option<f64>,
    pub follow_up_fee: Option<f64>,
    pub emergency_fee: Option<f64>,
    pub member_since: DateTime<Utc>,
}

impl From<Account> for DoctorCard {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            specialization: account.specialization,
            experience_years: account.experience_years,
            qualifications: account.qualifications,
            bio: account.bio,
            profile_image_url: account.profile_image_url,
            consultation_fee: account.consultation_fee,
            follow_up_fee: account.follow_up_fee,
            emergency_fee: account.emergency_fee,
            member_since: account.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DoctorDirectoryQuery {
    pub specialization: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Profile not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Field {0} cannot be set on a {1} profile")]
    FieldNotAllowed(String, Role),

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound | ProfileError::DoctorNotFound => AppError::NotFound(err.to_string()),
            ProfileError::FieldNotAllowed(..) => AppError::BadRequest(err.to_string()),
            ProfileError::ValidationError(msg) => AppError::ValidationError(msg),
            ProfileError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
