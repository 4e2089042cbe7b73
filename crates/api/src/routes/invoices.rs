//! Invoice routes

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use billtrack_shared::{Invoice, InvoiceId, InvoicePatch, InvoiceStatus, NewInvoice, RecurrenceKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;

use super::parse_id;
use crate::{
    auth::AuthUser,
    error::ApiResult,
    state::AppState,
    validation::{
        date, installment, money, nullable, optional, payee, recurrence, required, status,
        JsonBody, Lenient, Validated,
    },
};

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub payee: Option<Lenient<String>>,
    pub description: Option<Lenient<String>>,
    pub amount: Option<Lenient<Decimal>>,
    pub due_date: Option<Lenient<OffsetDateTime>>,
    pub status: Option<Lenient<InvoiceStatus>>,
    pub paid_amount: Option<Lenient<Decimal>>,
    pub recurrence_type: Option<Lenient<RecurrenceKind>>,
    pub total_installments: Option<Lenient<i64>>,
    pub current_installment: Option<Lenient<i64>>,
}

impl CreateInvoiceRequest {
    pub fn validate(self) -> Validated<NewInvoice> {
        Ok(NewInvoice {
            payee: payee(required(self.payee, "payee", "Payee is required")?)?,
            description: optional(self.description, description)?,
            amount: money(
                required(self.amount, "amount", "Amount is required")?,
                "amount",
                "Amount",
            )?,
            due_date: date(
                required(self.due_date, "dueDate", "Due date is required")?,
                "dueDate",
            )?,
            status: optional(self.status, status)?.unwrap_or_default(),
            paid_amount: optional(self.paid_amount, |v| money(v, "paidAmount", "Paid amount"))?
                .unwrap_or(Decimal::ZERO),
            recurrence_type: optional(self.recurrence_type, recurrence)?.unwrap_or_default(),
            total_installments: optional(self.total_installments, |v| {
                installment(v, "totalInstallments")
            })?,
            current_installment: optional(self.current_installment, |v| {
                installment(v, "currentInstallment")
            })?,
        })
    }
}

/// Every field is optional; present fields follow the create rules.
/// An explicit `"description": null` clears the description.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub payee: Option<Lenient<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<Lenient<String>>>,
    pub amount: Option<Lenient<Decimal>>,
    pub due_date: Option<Lenient<OffsetDateTime>>,
    pub status: Option<Lenient<InvoiceStatus>>,
    pub paid_amount: Option<Lenient<Decimal>>,
    pub recurrence_type: Option<Lenient<RecurrenceKind>>,
    pub total_installments: Option<Lenient<i64>>,
    pub current_installment: Option<Lenient<i64>>,
}

impl UpdateInvoiceRequest {
    pub fn validate(self) -> Validated<InvoicePatch> {
        Ok(InvoicePatch {
            payee: optional(self.payee, payee)?,
            description: self
                .description
                .map(|d| optional(d, description))
                .transpose()?,
            amount: optional(self.amount, |v| money(v, "amount", "Amount"))?,
            due_date: optional(self.due_date, |v| date(v, "dueDate"))?,
            status: optional(self.status, status)?,
            paid_amount: optional(self.paid_amount, |v| money(v, "paidAmount", "Paid amount"))?,
            recurrence_type: optional(self.recurrence_type, recurrence)?,
            total_installments: optional(self.total_installments, |v| {
                installment(v, "totalInstallments")
            })?,
            current_installment: optional(self.current_installment, |v| {
                installment(v, "currentInstallment")
            })?,
        })
    }
}

fn description(value: Lenient<String>) -> Validated<String> {
    value.check("description", "Description must be a string")
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's invoices, earliest due first
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.list(auth_user.user_id).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let id: InvoiceId = parse_id(&id, "Invoice")?;
    Ok(Json(state.invoices.get(auth_user.user_id, id).await?))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let input = body.validate()?;
    let invoice = state.invoices.create(auth_user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Partial update. A transition to `paid` settles the invoice.
pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateInvoiceRequest>,
) -> ApiResult<Json<Invoice>> {
    let id: InvoiceId = parse_id(&id, "Invoice")?;
    let patch = body.validate()?;
    Ok(Json(state.invoices.update(auth_user.user_id, id, &patch).await?))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: InvoiceId = parse_id(&id, "Invoice")?;
    state.invoices.delete(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
