//! Storage abstraction
//!
//! Every operation takes the caller's [`UserId`] explicitly; rows owned by
//! another user behave exactly like missing rows.

use async_trait::async_trait;
use billtrack_shared::{
    AiReport, Invoice, InvoiceId, InvoicePatch, NewInvoice, NewNotification, Notification,
    NotificationId, ReportId, ReportKind, TrackerResult, User, UserId, UserSettingsPatch,
};

use crate::settlement::Settlement;

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Cheap connectivity check for the readiness route
    async fn ping(&self) -> TrackerResult<()>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Create the user row on first sight; existing rows are left untouched
    async fn ensure_user(&self, user_id: UserId, email: Option<&str>) -> TrackerResult<()>;

    async fn get_user(&self, user_id: UserId) -> TrackerResult<Option<User>>;

    async fn update_user_settings(
        &self,
        user_id: UserId,
        patch: &UserSettingsPatch,
    ) -> TrackerResult<Option<User>>;

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    /// All invoices of the user, ordered by due date
    async fn list_invoices(&self, user_id: UserId) -> TrackerResult<Vec<Invoice>>;

    async fn get_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<Option<Invoice>>;

    async fn create_invoice(&self, user_id: UserId, invoice: NewInvoice) -> TrackerResult<Invoice>;

    /// Apply `patch` and its settlement side effects atomically.
    ///
    /// Returns `None` when the invoice does not exist for this user.
    async fn update_invoice(
        &self,
        user_id: UserId,
        id: InvoiceId,
        patch: &InvoicePatch,
    ) -> TrackerResult<Option<Settlement>>;

    /// Returns `false` when nothing was deleted
    async fn delete_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<bool>;

    // -------------------------------------------------------------------------
    // Credits
    // -------------------------------------------------------------------------

    /// Current balance, 0 when the user never bought credits
    async fn credit_balance(&self, user_id: UserId) -> TrackerResult<i32>;

    /// Upsert the ledger row and return the new balance
    async fn add_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<i32>;

    /// Conditional decrement. `None` means the balance was insufficient and
    /// nothing changed.
    async fn deduct_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<Option<i32>>;

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    /// Charge `cost` credits and store the report in one transaction.
    /// `None` means the balance was insufficient and nothing was written.
    async fn charge_and_store_report(
        &self,
        user_id: UserId,
        cost: i32,
        kind: ReportKind,
        content: &serde_json::Value,
    ) -> TrackerResult<Option<AiReport>>;

    /// Reports of the user, newest first
    async fn list_reports(&self, user_id: UserId) -> TrackerResult<Vec<AiReport>>;

    async fn get_report(&self, user_id: UserId, id: ReportId) -> TrackerResult<Option<AiReport>>;

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    /// Notifications of the user, newest first
    async fn list_notifications(&self, user_id: UserId) -> TrackerResult<Vec<Notification>>;

    async fn create_notification(
        &self,
        user_id: UserId,
        notification: NewNotification,
    ) -> TrackerResult<Notification>;

    /// Returns `false` when the notification does not exist for this user
    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> TrackerResult<bool>;
}
