//! User profile, settings and notifications

use std::sync::Arc;

use billtrack_shared::{
    NewNotification, Notification, NotificationId, User, UserId, UserSettingsPatch,
};

use crate::error::{BillingError, BillingResult};
use crate::store::BillingStore;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn BillingStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Create the user row on first authenticated request
    pub async fn ensure_user(&self, user_id: UserId, email: Option<&str>) -> BillingResult<()> {
        Ok(self.store.ensure_user(user_id, email).await?)
    }

    pub async fn get_user(&self, user_id: UserId) -> BillingResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("user {}", user_id)))
    }

    pub async fn update_settings(
        &self,
        user_id: UserId,
        patch: &UserSettingsPatch,
    ) -> BillingResult<User> {
        let user = self
            .store
            .update_user_settings(user_id, patch)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("user {}", user_id)))?;

        tracing::info!(
            user_id = %user_id,
            language = %user.language,
            currency = %user.currency,
            "User settings updated"
        );
        Ok(user)
    }

    pub async fn list_notifications(&self, user_id: UserId) -> BillingResult<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id).await?)
    }

    /// Deliver a notification unless the user turned notifications off.
    /// Returns `None` when nothing was stored.
    pub async fn notify(
        &self,
        user_id: UserId,
        notification: NewNotification,
    ) -> BillingResult<Option<Notification>> {
        let enabled = self
            .store
            .get_user(user_id)
            .await?
            .map_or(false, |user| user.notifications_enabled);
        if !enabled {
            return Ok(None);
        }

        let created = self.store.create_notification(user_id, notification).await?;
        tracing::debug!(user_id = %user_id, notification_id = %created.id, "Notification created");
        Ok(Some(created))
    }

    pub async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> BillingResult<()> {
        if !self.store.mark_notification_read(user_id, id).await? {
            return Err(BillingError::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }
}
