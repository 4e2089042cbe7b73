//! In-memory [`BillingStore`] for tests and local demos
//!
//! All operations run under one mutex, which gives every call the same
//! atomicity the PostgreSQL store gets from its transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use billtrack_shared::{
    AiReport, Invoice, InvoiceId, InvoicePatch, NewInvoice, NewNotification, Notification,
    NotificationId, ReportId, ReportKind, TrackerError, TrackerResult, User, UserId,
    UserSettingsPatch,
};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::settlement::{self, Settlement};
use crate::store::BillingStore;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    invoices: Vec<Invoice>,
    credits: HashMap<UserId, i32>,
    reports: Vec<AiReport>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invoices across all users
    pub async fn invoice_count(&self) -> usize {
        self.state.lock().await.invoices.len()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn ping(&self) -> TrackerResult<()> {
        Ok(())
    }

    async fn ensure_user(&self, user_id: UserId, email: Option<&str>) -> TrackerResult<()> {
        let mut state = self.state.lock().await;
        state.users.entry(user_id).or_insert_with(|| {
            User::new(user_id, email.map(str::to_string), OffsetDateTime::now_utc())
        });
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> TrackerResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn update_user_settings(
        &self,
        user_id: UserId,
        patch: &UserSettingsPatch,
    ) -> TrackerResult<Option<User>> {
        let mut state = self.state.lock().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            patch.apply_to(user);
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }

    async fn list_invoices(&self, user_id: UserId) -> TrackerResult<Vec<Invoice>> {
        let state = self.state.lock().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| (i.due_date, i.created_at));
        Ok(invoices)
    }

    async fn get_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<Option<Invoice>> {
        let state = self.state.lock().await;
        Ok(state
            .invoices
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .cloned())
    }

    async fn create_invoice(&self, user_id: UserId, invoice: NewInvoice) -> TrackerResult<Invoice> {
        let row = invoice.into_invoice(user_id, OffsetDateTime::now_utc());
        self.state.lock().await.invoices.push(row.clone());
        Ok(row)
    }

    async fn update_invoice(
        &self,
        user_id: UserId,
        id: InvoiceId,
        patch: &InvoicePatch,
    ) -> TrackerResult<Option<Settlement>> {
        let mut state = self.state.lock().await;

        let Some(position) = state
            .invoices
            .iter()
            .position(|i| i.id == id && i.user_id == user_id)
        else {
            return Ok(None);
        };

        let plan = settlement::plan(&state.invoices[position], patch, OffsetDateTime::now_utc())?;

        // Checked before any write so a rejected settlement leaves no trace
        let debited = match (plan.wallet_debit, state.users.get(&user_id)) {
            (Some(debit), Some(user)) => Some(settlement::debit_wallet(user.balance, debit)?),
            _ => None,
        };

        state.invoices[position] = plan.updated.clone();
        if let (Some(balance), Some(user)) = (debited, state.users.get_mut(&user_id)) {
            user.balance = balance;
            user.updated_at = plan.updated.updated_at;
        }

        let successor = plan.successor.map(|next| {
            let row = next.into_invoice(user_id, plan.updated.updated_at);
            state.invoices.push(row.clone());
            row
        });

        Ok(Some(Settlement {
            invoice: plan.updated,
            wallet_debit: plan.wallet_debit,
            successor,
        }))
    }

    async fn delete_invoice(&self, user_id: UserId, id: InvoiceId) -> TrackerResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.invoices.len();
        state.invoices.retain(|i| !(i.id == id && i.user_id == user_id));
        Ok(state.invoices.len() < before)
    }

    async fn credit_balance(&self, user_id: UserId) -> TrackerResult<i32> {
        Ok(self.state.lock().await.credits.get(&user_id).copied().unwrap_or(0))
    }

    async fn add_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<i32> {
        let mut state = self.state.lock().await;
        let balance = state.credits.entry(user_id).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TrackerError::Internal("credit balance overflow".to_string()))?;
        Ok(*balance)
    }

    async fn deduct_credits(&self, user_id: UserId, amount: i32) -> TrackerResult<Option<i32>> {
        let mut state = self.state.lock().await;
        Ok(deduct(&mut state, user_id, amount))
    }

    async fn charge_and_store_report(
        &self,
        user_id: UserId,
        cost: i32,
        kind: ReportKind,
        content: &serde_json::Value,
    ) -> TrackerResult<Option<AiReport>> {
        let mut state = self.state.lock().await;
        if deduct(&mut state, user_id, cost).is_none() {
            return Ok(None);
        }

        let report = AiReport {
            id: ReportId::new(),
            user_id,
            report_type: kind,
            content: content.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.reports.push(report.clone());
        Ok(Some(report))
    }

    async fn list_reports(&self, user_id: UserId) -> TrackerResult<Vec<AiReport>> {
        let state = self.state.lock().await;
        let mut reports: Vec<AiReport> = state
            .reports
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn get_report(&self, user_id: UserId, id: ReportId) -> TrackerResult<Option<AiReport>> {
        let state = self.state.lock().await;
        Ok(state
            .reports
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn list_notifications(&self, user_id: UserId) -> TrackerResult<Vec<Notification>> {
        let state = self.state.lock().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn create_notification(
        &self,
        user_id: UserId,
        notification: NewNotification,
    ) -> TrackerResult<Notification> {
        let created = Notification {
            id: NotificationId::new(),
            user_id,
            title: notification.title,
            message: notification.message,
            read: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().await.notifications.push(created.clone());
        Ok(created)
    }

    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> TrackerResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn deduct(state: &mut State, user_id: UserId, amount: i32) -> Option<i32> {
    let balance = state.credits.get_mut(&user_id)?;
    if *balance < amount {
        return None;
    }
    *balance -= amount;
    Some(*balance)
}
