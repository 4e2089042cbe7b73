//! Request body parsing and field validation
//!
//! Request types derive `Deserialize` and wrap each field in [`Lenient`], so a
//! value of the wrong shape does not abort deserialization. Each request's
//! `validate()` then walks its fields in schema order and reports the first
//! failing one. Numbers may be sent as numeric strings and dates as either
//! RFC 3339 timestamps or plain `YYYY-MM-DD` dates.

use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use billtrack_shared::{InvoiceStatus, RecurrenceKind, MAX_MONEY};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

use crate::error::ApiError;

pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "pt-BR"];
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "BRL"];
pub const MAX_NICKNAME_CHARS: usize = 64;
pub const MAX_PAYEE_CHARS: usize = 255;
pub const MAX_CREDIT_TOP_UP: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Option<&'static str>,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            message: message.into(),
        }
    }

    fn not_an_object() -> Self {
        Self {
            field: None,
            message: "Request body must be a JSON object".to_string(),
        }
    }
}

pub type Validated<T> = Result<T, ValidationError>;

// =============================================================================
// Extractor
// =============================================================================

/// A JSON object body deserialized into `T`. An empty body counts as `{}`.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        parse_body(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::from(e).into_response())
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Validated<T> {
    let value = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(bytes).map_err(|_| ValidationError::not_an_object())?
    };

    if !value.is_object() {
        return Err(ValidationError::not_an_object());
    }
    serde_json::from_value(value).map_err(|_| ValidationError::not_an_object())
}

// =============================================================================
// Lenient fields
// =============================================================================

/// Conversion from a raw JSON value, `None` when the value has the wrong shape
pub trait Coerce: Sized {
    fn coerce(value: &Value) -> Option<Self>;
}

/// A body field that keeps going when coercion fails, so `validate()` can
/// name it.
#[derive(Debug, Clone, PartialEq)]
pub enum Lenient<T> {
    Valid(T),
    Invalid,
}

impl<T> Lenient<T> {
    pub fn check(self, field: &'static str, message: &str) -> Validated<T> {
        match self {
            Lenient::Valid(value) => Ok(value),
            Lenient::Invalid => Err(ValidationError::field(field, message)),
        }
    }
}

impl<'de, T: Coerce> Deserialize<'de> for Lenient<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(T::coerce(&value).map_or(Lenient::Invalid, Lenient::Valid))
    }
}

/// Keeps an explicit `null` apart from a missing field: absent is `None`,
/// null is `Some(None)`. Use with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Coerce for String {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// JSON number or numeric string, rounded to two decimal places
impl Coerce for Decimal {
    fn coerce(value: &Value) -> Option<Self> {
        let raw = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return None,
        };

        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
            .map(|d| d.round_dp(2))
    }
}

/// Whole JSON number or integer string
impl Coerce for i64 {
    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC)
impl Coerce for OffsetDateTime {
    fn coerce(value: &Value) -> Option<Self> {
        let raw = value.as_str()?.trim();
        if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(at);
        }
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|d| d.midnight().assume_utc())
    }
}

impl Coerce for InvoiceStatus {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

impl Coerce for RecurrenceKind {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

// =============================================================================
// Field rules
// =============================================================================

/// Present, or a "required" error
pub fn required<T>(
    value: Option<Lenient<T>>,
    field: &'static str,
    missing: &str,
) -> Validated<Lenient<T>> {
    value.ok_or_else(|| ValidationError::field(field, missing))
}

pub fn payee(value: Lenient<String>) -> Validated<String> {
    let payee = value.check("payee", "Payee is required")?;
    let payee = payee.trim();

    if payee.is_empty() {
        return Err(ValidationError::field("payee", "Payee is required"));
    }
    if payee.chars().count() > MAX_PAYEE_CHARS {
        return Err(ValidationError::field(
            "payee",
            format!("Payee must be at most {} characters", MAX_PAYEE_CHARS),
        ));
    }
    Ok(payee.to_string())
}

/// Non-negative money amount within NUMERIC(14, 2)
pub fn money(value: Lenient<Decimal>, field: &'static str, label: &str) -> Validated<Decimal> {
    let amount = value.check(field, &format!("{} must be a number", label))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::field(field, format!("{} must be positive", label)));
    }
    if amount > MAX_MONEY {
        return Err(ValidationError::field(field, format!("{} is too large", label)));
    }
    Ok(amount)
}

/// Installment counters are integers >= 1
pub fn installment(value: Lenient<i64>, field: &'static str) -> Validated<i32> {
    const MESSAGE: &str = "Installments must be a positive integer";
    let count = value.check(field, MESSAGE)?;

    i32::try_from(count)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| ValidationError::field(field, MESSAGE))
}

pub fn status(value: Lenient<InvoiceStatus>) -> Validated<InvoiceStatus> {
    value.check("status", "Status must be one of unpaid, overdue, paid")
}

pub fn recurrence(value: Lenient<RecurrenceKind>) -> Validated<RecurrenceKind> {
    value.check(
        "recurrenceType",
        "Recurrence type must be one of none, monthly, annual, installment",
    )
}

pub fn date(value: Lenient<OffsetDateTime>, field: &'static str) -> Validated<OffsetDateTime> {
    value.check(field, "Invalid date")
}

pub fn one_of(
    value: Lenient<String>,
    allowed: &[&str],
    field: &'static str,
    message: &str,
) -> Validated<String> {
    let invalid = || {
        ValidationError::field(
            field,
            format!("{}. Expected one of: {}", message, allowed.join(", ")),
        )
    };

    match value {
        Lenient::Valid(s) if allowed.contains(&s.as_str()) => Ok(s),
        _ => Err(invalid()),
    }
}

/// Validate an optional field with `rule`
pub fn optional<T, U>(
    value: Option<Lenient<T>>,
    rule: impl FnOnce(Lenient<T>) -> Validated<U>,
) -> Validated<Option<U>> {
    value.map(rule).transpose()
}
