//! Bearer token authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use billtrack_billing::AccountService;
use billtrack_shared::UserId;

use super::jwt::JwtManager;
use crate::error::ApiError;

/// State needed by the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtManager,
    pub accounts: AccountService,
}

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Reject requests without a valid bearer token.
///
/// On success the caller's user row is created if this is the first request
/// seen for the subject.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let claims = auth.jwt.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, path = %request.uri().path(), "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    let user = AuthUser {
        user_id: UserId(claims.sub),
        email: claims.email,
    };
    auth.accounts
        .ensure_user(user.user_id, user.email.as_deref())
        .await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
