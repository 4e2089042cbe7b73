//! Shared application state

use std::sync::Arc;

use billtrack_billing::{
    AccountService, BillingStore, CreditService, InvoiceService, ReportGenerator, ReportService,
};

use crate::auth::{AuthState, JwtManager};
use crate::config::Config;

/// Handles shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BillingStore>,
    pub invoices: InvoiceService,
    pub credits: CreditService,
    pub reports: ReportService,
    pub accounts: AccountService,
    pub jwt: JwtManager,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn BillingStore>,
        generator: Arc<dyn ReportGenerator>,
    ) -> Self {
        Self {
            invoices: InvoiceService::new(store.clone()),
            credits: CreditService::new(store.clone()),
            reports: ReportService::new(store.clone(), generator),
            accounts: AccountService::new(store.clone()),
            jwt: JwtManager::new(&config.jwt_secret),
            store,
            config: Arc::new(config),
        }
    }

    /// Subset of state needed by the auth middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt: self.jwt.clone(),
            accounts: self.accounts.clone(),
        }
    }
}
