//! Account routes

use axum::{
    extract::{Extension, State},
    Json,
};
use billtrack_shared::{User, UserSettingsPatch, MAX_MONEY};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    error::ApiResult,
    state::AppState,
    validation::{
        one_of, optional, JsonBody, Lenient, Validated, ValidationError, MAX_NICKNAME_CHARS,
        SUPPORTED_CURRENCIES, SUPPORTED_LANGUAGES,
    },
};

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub language: Option<Lenient<String>>,
    pub currency: Option<Lenient<String>>,
    pub notifications_enabled: Option<Lenient<bool>>,
    pub balance: Option<Lenient<Decimal>>,
    pub nickname: Option<Lenient<String>>,
}

impl UpdateSettingsRequest {
    pub fn validate(self) -> Validated<UserSettingsPatch> {
        Ok(UserSettingsPatch {
            language: optional(self.language, |v| {
                one_of(v, SUPPORTED_LANGUAGES, "language", "Unsupported language")
            })?,
            currency: optional(self.currency, |v| {
                one_of(v, SUPPORTED_CURRENCIES, "currency", "Unsupported currency")
            })?,
            notifications_enabled: optional(self.notifications_enabled, |v| {
                v.check("notificationsEnabled", "Notifications flag must be a boolean")
            })?,
            balance: optional(self.balance, balance)?,
            nickname: optional(self.nickname, nickname)?,
        })
    }
}

/// Wallet balance may be negative but must fit NUMERIC(14, 2)
fn balance(value: Lenient<Decimal>) -> Validated<Decimal> {
    let balance = value.check("balance", "Balance must be a number")?;
    if balance.abs() > MAX_MONEY {
        return Err(ValidationError::field("balance", "Balance is too large"));
    }
    Ok(balance)
}

fn nickname(value: Lenient<String>) -> Validated<String> {
    let nickname = value.check("nickname", "Nickname must be a string")?;
    if nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(ValidationError::field(
            "nickname",
            format!("Nickname must be at most {} characters", MAX_NICKNAME_CHARS),
        ));
    }
    Ok(nickname)
}

// =============================================================================
// Handlers
// =============================================================================

/// The caller's own user record
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.get_user(auth_user.user_id).await?))
}

/// Update language, currency, notification flag, wallet balance or nickname
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody<UpdateSettingsRequest>,
) -> ApiResult<Json<User>> {
    let patch = body.validate()?;
    Ok(Json(
        state
            .accounts
            .update_settings(auth_user.user_id, &patch)
            .await?,
    ))
}
