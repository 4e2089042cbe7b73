//! Credit ledger routes

use axum::{
    extract::{Extension, State},
    Json,
};
use billtrack_shared::CreditBalance;
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    error::ApiResult,
    state::AppState,
    validation::{JsonBody, Lenient, Validated, ValidationError, MAX_CREDIT_TOP_UP},
};

/// Top-up request; `amount` defaults to 1
#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    pub amount: Option<Lenient<i64>>,
}

impl AddCreditsRequest {
    pub fn validate(self) -> Validated<i32> {
        const MESSAGE: &str = "Amount must be a positive integer";
        let amount = match self.amount {
            Some(amount) => amount.check("amount", MESSAGE)?,
            None => 1,
        };

        if amount < 1 {
            return Err(ValidationError::field("amount", MESSAGE));
        }
        if amount > MAX_CREDIT_TOP_UP {
            return Err(ValidationError::field(
                "amount",
                format!("Amount must be at most {}", MAX_CREDIT_TOP_UP),
            ));
        }
        i32::try_from(amount).map_err(|_| ValidationError::field("amount", MESSAGE))
    }
}

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<CreditBalance>> {
    let balance = state.credits.balance(auth_user.user_id).await?;
    Ok(Json(CreditBalance { balance }))
}

/// Demo top-up; there is no payment processor behind it
pub async fn add_credits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody<AddCreditsRequest>,
) -> ApiResult<Json<CreditBalance>> {
    let amount = body.validate()?;
    let balance = state.credits.add(auth_user.user_id, amount).await?;
    Ok(Json(CreditBalance { balance }))
}
