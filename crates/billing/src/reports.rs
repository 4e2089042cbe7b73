//! Credit-gated report generation

use std::sync::Arc;

use billtrack_shared::{AiReport, Invoice, ReportId, ReportKind, UserId};
use time::OffsetDateTime;

use crate::ai::ReportGenerator;
use crate::error::{BillingError, BillingResult};
use crate::store::BillingStore;

/// Credits charged per generated report
pub const REPORT_COST: i32 = 1;

/// Inclusive due-date window for the invoices sent to the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportRange {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl ReportRange {
    pub fn contains(&self, invoice: &Invoice) -> bool {
        self.start.map_or(true, |start| invoice.due_date >= start)
            && self.end.map_or(true, |end| invoice.due_date <= end)
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn BillingStore>,
    generator: Arc<dyn ReportGenerator>,
}

impl ReportService {
    pub fn new(store: Arc<dyn BillingStore>, generator: Arc<dyn ReportGenerator>) -> Self {
        Self { store, generator }
    }

    /// Generate and store a report, charging [`REPORT_COST`] credits.
    ///
    /// The balance is checked before the model is called and charged only
    /// after a successful call, together with the report insert. A failed
    /// call costs nothing.
    pub async fn generate(&self, user_id: UserId, range: ReportRange) -> BillingResult<AiReport> {
        let balance = self.store.credit_balance(user_id).await?;
        if balance < REPORT_COST {
            tracing::warn!(user_id = %user_id, balance, "Report refused, insufficient credits");
            return Err(BillingError::InsufficientCredits {
                balance,
                required: REPORT_COST,
            });
        }

        let invoices: Vec<Invoice> = self
            .store
            .list_invoices(user_id)
            .await?
            .into_iter()
            .filter(|invoice| range.contains(invoice))
            .collect();

        let content = self.generator.generate(&invoices).await.map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Report generation failed");
            e
        })?;

        let Some(report) = self
            .store
            .charge_and_store_report(user_id, REPORT_COST, ReportKind::MonthlySummary, &content)
            .await?
        else {
            // Balance spent by a concurrent request while the model was running
            let balance = self.store.credit_balance(user_id).await?;
            tracing::warn!(
                user_id = %user_id,
                balance,
                "Report discarded, credits spent meanwhile"
            );
            return Err(BillingError::InsufficientCredits {
                balance,
                required: REPORT_COST,
            });
        };

        tracing::info!(
            user_id = %user_id,
            report_id = %report.id,
            invoice_count = invoices.len(),
            "Report generated"
        );
        Ok(report)
    }

    pub async fn list(&self, user_id: UserId) -> BillingResult<Vec<AiReport>> {
        Ok(self.store.list_reports(user_id).await?)
    }

    pub async fn get(&self, user_id: UserId, id: ReportId) -> BillingResult<AiReport> {
        self.store
            .get_report(user_id, id)
            .await?
            .ok_or_else(|| BillingError::NotFound(format!("report {}", id)))
    }
}
