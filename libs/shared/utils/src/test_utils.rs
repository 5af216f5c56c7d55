use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::account::Account;
use shared_models::auth::{JwtClaims, Role};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiry_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_account(&self) -> Account {
        serde_json::from_value(MockSupabaseResponses::account_response(self))
            .expect("mock account row matches the Account schema")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("HS256 signing with an in-memory key does not fail")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user, secret, Some(24)))
    }
}

/// Row shapes as PostgREST returns them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn account_response(user: &TestUser) -> Value {
        json!({
            "id": user.id,
            "email": user.email,
            "passwordHash": "",
            "role": user.role,
            "firstName": "Test",
            "lastName": "User",
            "phone": null,
            "dateOfBirth": null,
            "gender": null,
            "address": null,
            "profileImageUrl": null,
            "isActive": true,
            "bloodType": null,
            "allergies": [],
            "medicalHistory": null,
            "emergencyContact": null,
            "specialization": null,
            "licenseNumber": null,
            "experienceYears": null,
            "qualifications": null,
            "bio": null,
            "consultationFee": null,
            "followUpFee": null,
            "emergencyFee": null,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        })
    }

    pub fn doctor_response(doctor_id: Uuid, specialization: &str, consultation_fee: Option<f64>) -> Value {
        let mut row = Self::account_response(&TestUser {
            id: doctor_id,
            email: format!("{}@clinic.example.com", doctor_id),
            role: Role::Doctor,
        });
        row["firstName"] = json!("Ada");
        row["lastName"] = json!("Lovelace");
        row["specialization"] = json!(specialization);
        row["licenseNumber"] = json!("MD-123456");
        row["experienceYears"] = json!(12);
        row["consultationFee"] = json!(consultation_fee);
        row
    }

    pub fn appointment_response(
        appointment_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: &str,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patientId": patient_id,
            "doctorId": doctor_id,
            "date": date,
            "time": time,
            "status": status,
            "appointmentType": "consultation",
            "fee": 100.0,
            "notes": null,
            "symptoms": null,
            "cancellationReason": null,
            "cancelledBy": null,
            "cancelledAt": null,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        })
    }

    pub fn notification_response(account_id: Uuid, is_read: bool) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "accountId": account_id,
            "title": "Appointment booked",
            "message": "You have a new appointment",
            "notificationType": "appointment-booked",
            "priority": "high",
            "isRead": is_read,
            "readAt": null,
            "data": { "appointmentId": Uuid::new_v4() },
            "createdAt": "2025-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_service_key, "test-service-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.role, Role::Doctor);

        let account = user.to_account();
        assert_eq!(account.id, user.id);
        assert_eq!(account.email, "doc@example.com");
        assert_eq!(account.role, Role::Doctor);
    }

    #[test]
    fn test_doctor_row_parses() {
        let id = Uuid::new_v4();
        let account: Account = serde_json::from_value(
            MockSupabaseResponses::doctor_response(id, "Cardiology", Some(120.0)),
        )
        .unwrap();

        assert!(account.is_active_doctor());
        assert_eq!(account.consultation_fee, Some(120.0));
    }
}
