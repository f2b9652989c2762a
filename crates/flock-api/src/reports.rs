use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use flock_types::api::{Claims, CreateReportRequest, Report};
use flock_types::models::ReportKind;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

/// Oldest reports are evicted beyond this many.
pub const MAX_REPORTS: usize = 100;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    if req.from > req.to {
        return Err(ApiError::bad_request("from must not be after to"));
    }

    let (kind, from, to) = (req.kind, req.from, req.to);
    let data = blocking(&state, move |db| {
        let value = match kind {
            ReportKind::Donations => serde_json::to_value(db.donation_report(from, to)?)?,
            ReportKind::Attendance => serde_json::to_value(db.attendance_report(from, to)?)?,
            ReportKind::Membership => serde_json::to_value(db.membership_report(from, to)?)?,
        };
        Ok(value)
    })
    .await?;

    let report = Report {
        id: Uuid::new_v4(),
        kind,
        from,
        to,
        generated_by: claims.sub,
        generated_at: Utc::now(),
        data,
    };

    {
        let mut reports = state.reports.write().await;
        if reports.len() >= MAX_REPORTS {
            reports.remove(0);
        }
        reports.push(report.clone());
    }

    info!("{} generated {} report {} ({} to {})", claims.sub, kind, report.id, from, to);
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Report>>> {
    require_staff(&claims)?;
    Ok(Json(state.reports.read().await.clone()))
}

pub async fn get_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<Json<Report>> {
    require_staff(&claims)?;
    state
        .reports
        .read()
        .await
        .iter()
        .find(|r| r.id == report_id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("report"))
}
