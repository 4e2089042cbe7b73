//! Credit ledger
//!
//! One integer balance per user. Credits are bought through `add` and spent
//! one per generated report.

use std::sync::Arc;

use billtrack_shared::UserId;

use crate::error::{BillingError, BillingResult};
use crate::store::BillingStore;

#[derive(Clone)]
pub struct CreditService {
    store: Arc<dyn BillingStore>,
}

impl CreditService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Current balance (0 before the first top-up)
    pub async fn balance(&self, user_id: UserId) -> BillingResult<i32> {
        Ok(self.store.credit_balance(user_id).await?)
    }

    /// Top up the ledger, creating it on first use. Returns the new balance.
    pub async fn add(&self, user_id: UserId, amount: i32) -> BillingResult<i32> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount(
                "Credit amount must be a positive integer".to_string(),
            ));
        }

        let balance = self.store.add_credits(user_id, amount).await?;
        tracing::info!(user_id = %user_id, amount, balance, "Credits added");
        Ok(balance)
    }

    /// Spend `amount` credits. Returns `false` without touching the ledger
    /// when the balance is too low.
    pub async fn deduct(&self, user_id: UserId, amount: i32) -> BillingResult<bool> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount(
                "Credit amount must be a positive integer".to_string(),
            ));
        }

        match self.store.deduct_credits(user_id, amount).await? {
            Some(balance) => {
                tracing::info!(user_id = %user_id, amount, balance, "Credits deducted");
                Ok(true)
            }
            None => {
                tracing::warn!(user_id = %user_id, amount, "Credit deduction refused");
                Ok(false)
            }
        }
    }
}
