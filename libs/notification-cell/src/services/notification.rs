use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Filter, Order, Query, SupabaseClient};

use crate::models::{
    Notification, NotificationAction, NotificationError, NotificationListQuery,
    NotificationListResponse, NOTIFICATIONS_TABLE,
};

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_notifications(
        &self,
        account_id: Uuid,
        params: &NotificationListQuery,
    ) -> Result<NotificationListResponse, NotificationError> {
        debug!("Listing notifications for account {}", account_id);

        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut query = Query::table(NOTIFICATIONS_TABLE)
            .filter(Filter::eq("accountId", account_id))
            .order(Order::Desc("createdAt"))
            .limit(limit)
            .offset(params.offset.unwrap_or(0));

        if params.unread_only.unwrap_or(false) {
            query = query.filter(Filter::IsFalse("isRead"));
        }

        let notifications: Vec<Notification> = self.supabase.select(&query).await?;
        let unread_count = self.unread_count(account_id).await?;

        Ok(NotificationListResponse {
            notifications,
            unread_count,
        })
    }

    pub async fn unread_count(&self, account_id: Uuid) -> Result<usize, NotificationError> {
        let query = Query::table(NOTIFICATIONS_TABLE)
            .filter(Filter::eq("accountId", account_id))
            .filter(Filter::IsFalse("isRead"));

        Ok(self.supabase.count(&query).await?)
    }

    /// Applies a bulk action to notifications owned by `account_id` and
    /// returns how many rows it touched. Ids belonging to other accounts are
    /// never matched.
    pub async fn apply_action(
        &self,
        account_id: Uuid,
        action: NotificationAction,
        notification_ids: &[Uuid],
    ) -> Result<usize, NotificationError> {
        if action != NotificationAction::MarkAllAsRead && notification_ids.is_empty() {
            return Err(NotificationError::ValidationError(
                "notificationIds must not be empty".to_string(),
            ));
        }

        let owned = Query::table(NOTIFICATIONS_TABLE).filter(Filter::eq("accountId", account_id));
        let selected = owned.clone().filter(Filter::any_of("id", notification_ids.iter()));

        let affected = match action {
            NotificationAction::MarkAsRead => {
                let rows: Vec<Notification> = self.supabase
                    .update(&selected, json!({ "isRead": true, "readAt": Utc::now().to_rfc3339() }))
                    .await?;
                rows.len()
            }
            NotificationAction::MarkAsUnread => {
                let rows: Vec<Notification> = self.supabase
                    .update(&selected, json!({ "isRead": false, "readAt": null }))
                    .await?;
                rows.len()
            }
            NotificationAction::Delete => self.supabase.delete(&selected).await?,
            NotificationAction::MarkAllAsRead => {
                let unread = owned.filter(Filter::IsFalse("isRead"));
                let rows: Vec<Notification> = self.supabase
                    .update(&unread, json!({ "isRead": true, "readAt": Utc::now().to_rfc3339() }))
                    .await?;
                rows.len()
            }
        };

        info!("Applied {:?} to {} notifications of account {}", action, affected, account_id);
        Ok(affected)
    }
}
