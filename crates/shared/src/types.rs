//! Common types used across Billtrack

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};

/// Largest magnitude a NUMERIC(14, 2) money column holds
pub const MAX_MONEY: Decimal = dec!(999_999_999_999.99);

/// Width of `notifications.title`
pub const MAX_NOTIFICATION_TITLE_CHARS: usize = 255;

// =============================================================================
// ID Wrappers
// =============================================================================

macro_rules! id_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_wrapper!(
    /// User ID wrapper (the auth provider's subject)
    UserId
);
id_wrapper!(
    /// Invoice ID wrapper
    InvoiceId
);
id_wrapper!(
    /// AI report ID wrapper
    ReportId
);
id_wrapper!(
    /// Notification ID wrapper
    NotificationId
);

// =============================================================================
// Enums
// =============================================================================

/// Payment status of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Overdue,
    Paid,
}

impl InvoiceStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unpaid => write!(f, "unpaid"),
            Self::Overdue => write!(f, "overdue"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "overdue" => Ok(Self::Overdue),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

/// Policy governing whether and how a paid invoice spawns a successor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    #[default]
    None,
    Monthly,
    Annual,
    Installment,
}

impl std::fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Monthly => write!(f, "monthly"),
            Self::Annual => write!(f, "annual"),
            Self::Installment => write!(f, "installment"),
        }
    }
}

impl std::str::FromStr for RecurrenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            "installment" => Ok(Self::Installment),
            _ => Err(format!("Invalid recurrence type: {}", s)),
        }
    }
}

/// Tag stored with every AI report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    MonthlySummary,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonthlySummary => write!(f, "monthly_summary"),
        }
    }
}

// =============================================================================
// Invoices
// =============================================================================

/// A billable obligation owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub user_id: UserId,
    pub payee: String,
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub due_date: OffsetDateTime,
    pub status: InvoiceStatus,
    pub paid_amount: Decimal,
    pub recurrence_type: RecurrenceKind,
    pub total_installments: Option<i32>,
    pub current_installment: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Invoice {
    /// Installment index may not pass the total on an installment plan
    pub fn check_installments(&self) -> TrackerResult<()> {
        check_installments(
            self.recurrence_type,
            self.total_installments,
            self.current_installment,
        )
    }
}

/// Validated input for a new invoice
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub payee: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub due_date: OffsetDateTime,
    pub status: InvoiceStatus,
    pub paid_amount: Decimal,
    pub recurrence_type: RecurrenceKind,
    pub total_installments: Option<i32>,
    pub current_installment: Option<i32>,
}

impl NewInvoice {
    pub fn check_installments(&self) -> TrackerResult<()> {
        check_installments(
            self.recurrence_type,
            self.total_installments,
            self.current_installment,
        )
    }

    /// Materialize the row a store will persist for `user_id`
    pub fn into_invoice(self, user_id: UserId, now: OffsetDateTime) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            user_id,
            payee: self.payee,
            description: self.description,
            amount: self.amount,
            due_date: self.due_date,
            status: self.status,
            paid_amount: self.paid_amount,
            recurrence_type: self.recurrence_type,
            total_installments: self.total_installments,
            current_installment: self.current_installment,
            created_at: now,
            updated_at: now,
        }
    }
}

fn check_installments(
    recurrence: RecurrenceKind,
    total: Option<i32>,
    current: Option<i32>,
) -> TrackerResult<()> {
    if let (RecurrenceKind::Installment, Some(total), Some(current)) = (recurrence, total, current)
    {
        if current > total {
            return Err(TrackerError::invalid(
                "currentInstallment",
                "Current installment cannot exceed total installments",
            ));
        }
    }
    Ok(())
}

/// Validated partial update of an invoice.
///
/// `description` is doubly optional: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
    pub payee: Option<String>,
    pub description: Option<Option<String>>,
    pub amount: Option<Decimal>,
    pub due_date: Option<OffsetDateTime>,
    pub status: Option<InvoiceStatus>,
    pub paid_amount: Option<Decimal>,
    pub recurrence_type: Option<RecurrenceKind>,
    pub total_installments: Option<i32>,
    pub current_installment: Option<i32>,
}

impl InvoicePatch {
    /// Apply every present field to `invoice`
    pub fn apply_to(&self, invoice: &mut Invoice) {
        if let Some(payee) = &self.payee {
            invoice.payee = payee.clone();
        }
        if let Some(description) = &self.description {
            invoice.description = description.clone();
        }
        if let Some(amount) = self.amount {
            invoice.amount = amount;
        }
        if let Some(due_date) = self.due_date {
            invoice.due_date = due_date;
        }
        if let Some(status) = self.status {
            invoice.status = status;
        }
        if let Some(paid_amount) = self.paid_amount {
            invoice.paid_amount = paid_amount;
        }
        if let Some(recurrence_type) = self.recurrence_type {
            invoice.recurrence_type = recurrence_type;
        }
        if let Some(total) = self.total_installments {
            invoice.total_installments = Some(total);
        }
        if let Some(current) = self.current_installment {
            invoice.current_installment = Some(current);
        }
    }
}

// =============================================================================
// Credits & Reports
// =============================================================================

/// Credit balance response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub balance: i32,
}

/// A stored AI-generated spending report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    pub id: ReportId,
    pub user_id: UserId,
    pub report_type: ReportKind,
    /// Raw model output, stored verbatim
    pub content: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Users
// =============================================================================

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Account record, created on first authenticated request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
    /// Wallet balance, debited when invoices are settled
    pub balance: Decimal,
    pub language: String,
    pub currency: String,
    pub notifications_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// A fresh account with default preferences
    pub fn new(id: UserId, email: Option<String>, now: OffsetDateTime) -> Self {
        Self {
            id,
            email,
            first_name: None,
            last_name: None,
            nickname: None,
            profile_image_url: None,
            balance: Decimal::ZERO,
            language: DEFAULT_LANGUAGE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            notifications_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated subset of account settings to change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSettingsPatch {
    pub language: Option<String>,
    pub currency: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub balance: Option<Decimal>,
    pub nickname: Option<String>,
}

impl UserSettingsPatch {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(language) = &self.language {
            user.language = language.clone();
        }
        if let Some(currency) = &self.currency {
            user.currency = currency.clone();
        }
        if let Some(enabled) = self.notifications_enabled {
            user.notifications_enabled = enabled;
        }
        if let Some(balance) = self.balance {
            user.balance = balance;
        }
        if let Some(nickname) = &self.nickname {
            user.nickname = Some(nickname.clone());
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
}

impl NewNotification {
    /// Titles longer than the column are cut on a char boundary
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        let mut title = title.into();
        if let Some((cut, _)) = title.char_indices().nth(MAX_NOTIFICATION_TITLE_CHARS) {
            title.truncate(cut);
        }
        Self {
            title,
            message: message.into(),
        }
    }
}
