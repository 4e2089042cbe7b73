//! Invoice settlement
//!
//! Applying an update to an invoice is planned here as a pure function of the
//! prior row and the patch. Stores execute the plan inside one transaction:
//! the invoice write, the wallet debit and the successor insert land together
//! or not at all.

use billtrack_shared::{Invoice, InvoicePatch, NewInvoice, TrackerError, TrackerResult, MAX_MONEY};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::recurrence;

/// Everything a store must write for one invoice update
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    /// The invoice with the patch applied
    pub updated: Invoice,
    /// Amount to subtract from the owner's wallet balance
    pub wallet_debit: Option<Decimal>,
    /// Follow-up occurrence to insert for the same owner
    pub successor: Option<NewInvoice>,
}

/// Outcome of an executed plan
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub invoice: Invoice,
    pub wallet_debit: Option<Decimal>,
    pub successor: Option<Invoice>,
}

/// Plan the writes for applying `patch` to `prior`.
///
/// Side effects only happen on a transition into `paid`: marking an invoice
/// that is already paid as paid again, or editing other fields, only
/// rewrites the row. The merged invoice is checked, so a patch carrying a
/// single installment counter cannot move the index past the stored total.
pub fn plan(
    prior: &Invoice,
    patch: &InvoicePatch,
    now: OffsetDateTime,
) -> TrackerResult<SettlementPlan> {
    let mut updated = prior.clone();
    patch.apply_to(&mut updated);
    updated.updated_at = now;
    updated.check_installments()?;

    if prior.status.is_paid() || !updated.status.is_paid() {
        return Ok(SettlementPlan {
            updated,
            wallet_debit: None,
            successor: None,
        });
    }

    let successor = recurrence::next_occurrence(&updated);
    Ok(SettlementPlan {
        wallet_debit: Some(updated.amount),
        successor,
        updated,
    })
}

/// Wallet balance after settling `debit`.
///
/// The wallet may go negative, but not past what a NUMERIC(14, 2) column
/// holds; such a settlement is rejected instead of failing at the database.
pub fn debit_wallet(balance: Decimal, debit: Decimal) -> TrackerResult<Decimal> {
    match balance.checked_sub(debit) {
        Some(next) if next >= -MAX_MONEY => Ok(next),
        _ => Err(wallet_limit()),
    }
}

pub(crate) fn wallet_limit() -> TrackerError {
    TrackerError::invalid("amount", "Settling this invoice would exceed the wallet balance limit")
}
