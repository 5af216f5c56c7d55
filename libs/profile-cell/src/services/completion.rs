//! Profile completion scoring.
//!
//! Required and optional fields carry separate weights per role. A required
//! field contributes `required_weight / required_count` points, so filling one
//! never lowers the score.

use shared_models::account::Account;
use shared_models::auth::Role;

use crate::models::ProfileCompletion;

struct Weights {
    required: f64,
    optional: f64,
}

const PATIENT_WEIGHTS: Weights = Weights { required: 70.0, optional: 30.0 };
const DOCTOR_WEIGHTS: Weights = Weights { required: 80.0, optional: 20.0 };
const ADMIN_WEIGHTS: Weights = Weights { required: 100.0, optional: 0.0 };

fn text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn common_required(account: &Account) -> Vec<(&'static str, bool)> {
    vec![
        ("firstName", !account.first_name.trim().is_empty()),
        ("lastName", !account.last_name.trim().is_empty()),
        ("email", !account.email.trim().is_empty()),
        ("phone", text(&account.phone)),
    ]
}

fn required_fields(account: &Account) -> Vec<(&'static str, bool)> {
    let mut fields = common_required(account);

    match account.role {
        Role::Patient => {
            fields.push(("dateOfBirth", account.date_of_birth.is_some()));
            fields.push(("gender", text(&account.gender)));
        }
        Role::Doctor => {
            fields.push(("specialization", text(&account.specialization)));
            fields.push(("licenseNumber", text(&account.license_number)));
            fields.push(("experienceYears", account.experience_years.is_some()));
            fields.push(("consultationFee", account.consultation_fee.is_some()));
        }
        Role::Admin => {}
    }

    fields
}

fn optional_fields(account: &Account) -> Vec<(&'static str, bool)> {
    match account.role {
        Role::Patient => vec![
            ("address", text(&account.address)),
            ("bloodType", text(&account.blood_type)),
            ("allergies", !account.allergies.is_empty()),
            ("medicalHistory", text(&account.medical_history)),
            ("emergencyContact", text(&account.emergency_contact)),
        ],
        Role::Doctor => vec![
            ("bio", text(&account.bio)),
            ("qualifications", text(&account.qualifications)),
            ("address", text(&account.address)),
            ("profileImageUrl", text(&account.profile_image_url)),
            ("followUpFee", account.follow_up_fee.is_some()),
            ("emergencyFee", account.emergency_fee.is_some()),
        ],
        Role::Admin => vec![],
    }
}

fn share(fields: &[(&'static str, bool)], weight: f64) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let filled = fields.iter().filter(|(_, present)| *present).count();
    weight * filled as f64 / fields.len() as f64
}

pub fn profile_completion(account: &Account) -> ProfileCompletion {
    let weights = match account.role {
        Role::Patient => PATIENT_WEIGHTS,
        Role::Doctor => DOCTOR_WEIGHTS,
        Role::Admin => ADMIN_WEIGHTS,
    };

    let required = required_fields(account);
    let optional = optional_fields(account);

    let score = share(&required, weights.required) + share(&optional, weights.optional);

    ProfileCompletion {
        percentage: score.round().clamp(0.0, 100.0) as u8,
        missing_fields: required
            .iter()
            .filter(|(_, present)| !*present)
            .map(|(name, _)| *name)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn bare(role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            password_hash: String::new(),
            role,
            first_name: "Sam".into(),
            last_name: "Doe".into(),
            phone: None,
            date_of_birth: None,
            gender: None,
            address: None,
            profile_image_url: None,
            is_active: true,
            blood_type: None,
            allergies: vec![],
            medical_history: None,
            emergency_contact: None,
            specialization: None,
            license_number: None,
            experience_years: None,
            qualifications: None,
            bio: None,
            consultation_fee: None,
            follow_up_fee: None,
            emergency_fee: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_patient_weights() {
        let mut patient = bare(Role::Patient);
        // 3 of 6 required
        assert_eq!(profile_completion(&patient).percentage, 35);

        patient.phone = Some("+353 1 234 5678".into());
        patient.date_of_birth = NaiveDate::from_ymd_opt(1990, 4, 2);
        patient.gender = Some("female".into());
        assert_eq!(profile_completion(&patient).percentage, 70);
        assert!(profile_completion(&patient).missing_fields.is_empty());

        patient.address = Some("1 Main St".into());
        patient.blood_type = Some("A+".into());
        patient.allergies = vec!["latex".into()];
        patient.medical_history = Some("asthma".into());
        patient.emergency_contact = Some("Alex".into());
        assert_eq!(profile_completion(&patient).percentage, 100);
    }

    #[test]
    fn test_doctor_weights() {
        let mut doctor = bare(Role::Doctor);
        let report = profile_completion(&doctor);
        // 3 of 8 required
        assert_eq!(report.percentage, 30);
        assert!(report.missing_fields.contains(&"licenseNumber"));

        doctor.phone = Some("555".into());
        doctor.specialization = Some("Dermatology".into());
        doctor.license_number = Some("MD-9".into());
        doctor.experience_years = Some(4);
        doctor.consultation_fee = Some(90.0);
        assert_eq!(profile_completion(&doctor).percentage, 80);

        doctor.bio = Some("Skin".into());
        doctor.follow_up_fee = Some(60.0);
        doctor.emergency_fee = Some(150.0);
        // 3 of 6 optional
        assert_eq!(profile_completion(&doctor).percentage, 90);
    }

    #[test]
    fn test_admin_uses_common_fields_only() {
        let mut admin = bare(Role::Admin);
        assert_eq!(profile_completion(&admin).percentage, 75);

        admin.phone = Some("555".into());
        admin.blood_type = Some("B-".into());
        assert_eq!(profile_completion(&admin).percentage, 100);
    }

    #[test]
    fn test_blank_text_does_not_count() {
        let mut patient = bare(Role::Patient);
        let before = profile_completion(&patient).percentage;
        patient.phone = Some("   ".into());
        assert_eq!(profile_completion(&patient).percentage, before);
    }

    #[test]
    fn test_filling_required_fields_never_lowers_the_score() {
        let mut patient = bare(Role::Patient);
        patient.first_name = String::new();
        patient.last_name = String::new();
        patient.email = String::new();
        patient.address = Some("somewhere".into());

        let steps: Vec<Box<dyn Fn(&mut Account)>> = vec![
            Box::new(|a: &mut Account| a.first_name = "Kim".into()),
            Box::new(|a: &mut Account| a.last_name = "Lee".into()),
            Box::new(|a: &mut Account| a.email = "kim@example.com".into()),
            Box::new(|a: &mut Account| a.phone = Some("555".into())),
            Box::new(|a: &mut Account| a.date_of_birth = NaiveDate::from_ymd_opt(1985, 1, 1)),
            Box::new(|a: &mut Account| a.gender = Some("male".into())),
        ];

        let mut last = profile_completion(&patient).percentage;
        for step in steps {
            step(&mut patient);
            let next = profile_completion(&patient).percentage;
            assert!(next >= last, "score dropped from {} to {}", last, next);
            last = next;
        }
        assert_eq!(last, 76);
    }
}
