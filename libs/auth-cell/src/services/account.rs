use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, Filter, Query, SupabaseClient};
use shared_models::account::{Account, ACCOUNTS_TABLE};
use shared_models::auth::Role;

use crate::models::{AuthError, RegisterRequest, MIN_PASSWORD_LENGTH};
use crate::services::password::PasswordService;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254
        && EMAIL_REGEX
            .as_ref()
            .is_some_and(|re| re.is_match(email))
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Checks a registration before anything is written.
pub fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    if !is_valid_email(request.email.trim()) {
        return Err(AuthError::ValidationError("Invalid email address".to_string()));
    }

    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(AuthError::ValidationError("First and last name are required".to_string()));
    }

    match request.role {
        Role::Patient => Ok(()),
        Role::Doctor => {
            if blank(&request.specialization) || blank(&request.license_number) {
                return Err(AuthError::ValidationError(
                    "Doctors must provide specialization and licenseNumber".to_string(),
                ));
            }
            if request.experience_years.is_some_and(|years| years < 0) {
                return Err(AuthError::ValidationError("experienceYears cannot be negative".to_string()));
            }
            if request.consultation_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
                return Err(AuthError::ValidationError("consultationFee must be a non-negative amount".to_string()));
            }
            Ok(())
        }
        Role::Admin => Err(AuthError::RoleNotAllowed(Role::Admin)),
    }
}

pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Account, AuthError> {
        validate_registration(&request)?;

        let email = request.email.trim().to_lowercase();
        debug!("Registering {} account for {}", request.role, email);

        let taken = self
            .supabase
            .exists(&Query::table(ACCOUNTS_TABLE).filter(Filter::eq("email", &email)))
            .await?;
        if taken {
            warn!("Registration rejected, email already in use: {}", email);
            return Err(AuthError::EmailTaken);
        }

        let password_hash = PasswordService::hash_password(&request.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        let mut row = json!({
            "email": email,
            "passwordHash": password_hash,
            "role": request.role,
            "firstName": request.first_name.trim(),
            "lastName": request.last_name.trim(),
            "phone": request.phone,
            "dateOfBirth": request.date_of_birth,
            "gender": request.gender,
            "isActive": true,
            "allergies": [],
            "createdAt": now,
            "updatedAt": now,
        });

        if request.role == Role::Doctor {
            row["specialization"] = json!(request.specialization);
            row["licenseNumber"] = json!(request.license_number);
            row["experienceYears"] = json!(request.experience_years);
            row["consultationFee"] = json!(request.consultation_fee);
        }

        let account: Account = self
            .supabase
            .insert(ACCOUNTS_TABLE, row)
            .await
            .map_err(|e| match e {
                // Unique email index
                DatabaseError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::DatabaseError(other),
            })?;

        info!("Registered {} account {}", account.role, account.id);
        Ok(account)
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = email.trim().to_lowercase();
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("email", &email));

        let account: Account = match self.supabase.select_one(&query).await? {
            Some(account) => account,
            None => {
                debug!("Login for unknown email {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let matches = PasswordService::verify_password(password, &account.password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash for {} is unreadable: {}", account.id, e);
            false
        });
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_active {
            warn!("Login attempt on deactivated account {}", account.id);
            return Err(AuthError::AccountInactive);
        }

        info!("Account {} logged in", account.id);
        Ok(account)
    }

    pub async fn find_by_id(&self, account_id: Uuid) -> Result<Account, AuthError> {
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", account_id));

        self.supabase
            .select_one(&query)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }
}
