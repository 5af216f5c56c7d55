use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Filter, Order, Query, SupabaseClient};
use shared_models::account::{Account, ACCOUNTS_TABLE};
use shared_models::auth::{AuthUser, Role};

use crate::models::{DoctorCard, DoctorDirectoryQuery, ProfileError, ProfileResponse, UpdateProfileRequest};
use crate::services::completion::profile_completion;

const DEFAULT_DIRECTORY_PAGE: u32 = 20;
const MAX_DIRECTORY_PAGE: u32 = 100;

pub struct ProfileService {
    supabase: SupabaseClient,
}

impl ProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_profile(&self, account_id: Uuid) -> Result<ProfileResponse, ProfileError> {
        debug!("Fetching profile {}", account_id);

        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", account_id));
        let account: Account = self
            .supabase
            .select_one(&query)
            .await?
            .ok_or(ProfileError::NotFound)?;

        Ok(with_completion(account))
    }

    pub async fn update_profile(
        &self,
        user: &AuthUser,
        request: UpdateProfileRequest,
    ) -> Result<ProfileResponse, ProfileError> {
        request.validate(user.role)?;

        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", user.id));
        let updated: Vec<Account> = self.supabase.update(&query, request.to_patch()).await?;
        let account = updated.into_iter().next().ok_or(ProfileError::NotFound)?;

        info!("Profile {} updated", account.id);
        Ok(with_completion(account))
    }

    /// Soft delete. The row stays so appointment history keeps its parties.
    pub async fn deactivate(&self, account_id: Uuid) -> Result<Account, ProfileError> {
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", account_id));
        let patch = json!({
            "isActive": false,
            "updatedAt": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Account> = self.supabase.update(&query, patch).await?;
        let account = updated.into_iter().next().ok_or(ProfileError::NotFound)?;

        info!("Account {} deactivated", account.id);
        Ok(account)
    }

    pub async fn list_doctors(&self, params: &DoctorDirectoryQuery) -> Result<Vec<DoctorCard>, ProfileError> {
        let specialization = params
            .specialization
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let query = Query::table(ACCOUNTS_TABLE)
            .filter(Filter::eq("role", Role::Doctor))
            .filter(Filter::IsTrue("isActive"))
            .filter_opt(specialization.map(|s| Filter::contains("specialization", s)))
            .order(Order::Asc("lastName"))
            .order(Order::Asc("firstName"))
            .limit(params.limit.unwrap_or(DEFAULT_DIRECTORY_PAGE).min(MAX_DIRECTORY_PAGE))
            .offset(params.offset.unwrap_or(0));

        let doctors: Vec<Account> = self.supabase.select(&query).await?;
        debug!("Directory returned {} doctors", doctors.len());

        Ok(doctors.into_iter().map(DoctorCard::from).collect())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<DoctorCard, ProfileError> {
        let query = Query::table(ACCOUNTS_TABLE).filter(Filter::eq("id", doctor_id));
        let account: Option<Account> = self.supabase.select_one(&query).await?;

        match account {
            Some(doctor) if doctor.is_active_doctor() => Ok(DoctorCard::from(doctor)),
            _ => Err(ProfileError::DoctorNotFound),
        }
    }
}

fn with_completion(account: Account) -> ProfileResponse {
    let completion = profile_completion(&account);
    ProfileResponse { profile: account, completion }
}
