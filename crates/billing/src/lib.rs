//! Billtrack billing rules
//!
//! Invoice settlement and recurrence, the credit ledger, and credit-gated
//! AI report generation, all expressed over the [`BillingStore`] trait.

pub mod accounts;
pub mod ai;
pub mod credits;
pub mod error;
pub mod invoices;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod postgres;
pub mod recurrence;
pub mod reports;
pub mod settlement;
pub mod store;

pub use accounts::AccountService;
pub use ai::{OpenAiConfig, OpenAiReportGenerator, ReportGenerator};
pub use credits::CreditService;
pub use error::{BillingError, BillingResult};
pub use invoices::InvoiceService;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use reports::{ReportRange, ReportService, REPORT_COST};
pub use settlement::{Settlement, SettlementPlan};
pub use store::BillingStore;
