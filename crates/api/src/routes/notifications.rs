//! Notification routes

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use billtrack_shared::{Notification, NotificationId};

use super::parse_id;
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

/// Caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.accounts.list_notifications(auth_user.user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id: NotificationId = parse_id(&id, "Notification")?;
    state
        .accounts
        .mark_notification_read(auth_user.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
