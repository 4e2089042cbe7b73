//! Invoice lifecycle service

use std::sync::Arc;

use billtrack_shared::{Invoice, InvoiceId, InvoicePatch, NewInvoice, NewNotification, UserId};

use crate::accounts::AccountService;
use crate::error::{BillingError, BillingResult};
use crate::store::BillingStore;

/// Invoice CRUD plus settlement on transition to `paid`
#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn BillingStore>,
    accounts: AccountService,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            store,
        }
    }

    pub async fn list(&self, user_id: UserId) -> BillingResult<Vec<Invoice>> {
        Ok(self.store.list_invoices(user_id).await?)
    }

    pub async fn get(&self, user_id: UserId, id: InvoiceId) -> BillingResult<Invoice> {
        self.store
            .get_invoice(user_id, id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("invoice {}", id)))
    }

    pub async fn create(&self, user_id: UserId, invoice: NewInvoice) -> BillingResult<Invoice> {
        invoice.check_installments()?;
        let created = self.store.create_invoice(user_id, invoice).await?;

        tracing::info!(
            user_id = %user_id,
            invoice_id = %created.id,
            amount = %created.amount,
            recurrence = %created.recurrence_type,
            "Invoice created"
        );

        Ok(created)
    }

    /// Apply a partial update. Marking an unpaid invoice paid debits the
    /// wallet and may create the next occurrence; only the updated invoice
    /// is returned.
    pub async fn update(
        &self,
        user_id: UserId,
        id: InvoiceId,
        patch: &InvoicePatch,
    ) -> BillingResult<Invoice> {
        let settlement = self
            .store
            .update_invoice(user_id, id, patch)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("invoice {}", id)))?;

        if let Some(debit) = settlement.wallet_debit {
            tracing::info!(
                user_id = %user_id,
                invoice_id = %id,
                debit = %debit,
                successor_id = ?settlement.successor.as_ref().map(|s| s.id.0),
                "Invoice settled"
            );
            if let Some(next) = &settlement.successor {
                self.announce_successor(user_id, next).await;
            }
        } else {
            tracing::debug!(user_id = %user_id, invoice_id = %id, "Invoice updated");
        }

        Ok(settlement.invoice)
    }

    /// Settlement is already committed, so a failed notification is only logged
    async fn announce_successor(&self, user_id: UserId, next: &Invoice) {
        let notification = NewNotification::new(
            format!("Next bill from {}", next.payee),
            format!(
                "{} of {} is due on {}",
                next.payee,
                next.amount,
                next.due_date.date()
            ),
        );

        if let Err(e) = self.accounts.notify(user_id, notification).await {
            tracing::warn!(
                user_id = %user_id,
                invoice_id = %next.id,
                error = %e,
                "Failed to store notification"
            );
        }
    }

    pub async fn delete(&self, user_id: UserId, id: InvoiceId) -> BillingResult<()> {
        if !self.store.delete_invoice(user_id, id).await? {
            return Err(BillingError::NotFound(format!("invoice {}", id)));
        }

        tracing::info!(user_id = %user_id, invoice_id = %id, "Invoice deleted");
        Ok(())
    }
}
