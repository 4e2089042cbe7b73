//! AI report routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use billtrack_billing::ReportRange;
use billtrack_shared::{AiReport, ReportId};
use serde::Deserialize;
use time::OffsetDateTime;

use super::parse_id;
use crate::{
    auth::AuthUser,
    error::ApiResult,
    state::AppState,
    validation::{date, optional, JsonBody, Lenient, Validated, ValidationError},
};

/// Optional due-date window for the invoices sent to the model
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub start_date: Option<Lenient<OffsetDateTime>>,
    pub end_date: Option<Lenient<OffsetDateTime>>,
}

impl GenerateReportRequest {
    pub fn validate(self) -> Validated<ReportRange> {
        let range = ReportRange {
            start: optional(self.start_date, |v| date(v, "startDate"))?,
            end: optional(self.end_date, |v| date(v, "endDate"))?,
        };

        if let (Some(start), Some(end)) = (range.start, range.end) {
            if end < start {
                return Err(ValidationError::field(
                    "endDate",
                    "End date must not be before start date",
                ));
            }
        }
        Ok(range)
    }
}

/// Generate a report for the caller, charging one credit on success.
///
/// Body is optional: `{ "startDate"?, "endDate"? }` narrows the invoices
/// sent to the model by due date.
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody<GenerateReportRequest>,
) -> ApiResult<Json<AiReport>> {
    let range = body.validate()?;
    Ok(Json(state.reports.generate(auth_user.user_id, range).await?))
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<AiReport>>> {
    Ok(Json(state.reports.list(auth_user.user_id).await?))
}

pub async fn get_report(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<AiReport>> {
    let id: ReportId = parse_id(&id, "Report")?;
    Ok(Json(state.reports.get(auth_user.user_id, id).await?))
}
