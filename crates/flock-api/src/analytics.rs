use axum::{
    Extension, Json,
    extract::State,
};
use chrono::Utc;

use flock_types::api::{AttendanceQuery, Claims, DashboardStats, EventAttendanceStats, GrowthQuery, MonthlyCount};

use crate::error::{ApiError, ApiQuery, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

const DEFAULT_GROWTH_MONTHS: u32 = 6;
const MAX_GROWTH_MONTHS: u32 = 24;

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<DashboardStats>> {
    require_staff(&claims)?;
    Ok(Json(blocking(&state, |db| db.dashboard_stats(Utc::now())).await?))
}

pub async fn member_growth(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<GrowthQuery>,
) -> ApiResult<Json<Vec<MonthlyCount>>> {
    require_staff(&claims)?;
    let months = query.months.unwrap_or(DEFAULT_GROWTH_MONTHS);
    if !(1..=MAX_GROWTH_MONTHS).contains(&months) {
        return Err(ApiError::bad_request("months must be between 1 and 24"));
    }
    Ok(Json(blocking(&state, move |db| db.member_growth(months, Utc::now())).await?))
}

pub async fn attendance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<AttendanceQuery>,
) -> ApiResult<Json<Vec<EventAttendanceStats>>> {
    require_staff(&claims)?;
    let stats = blocking(&state, move |db| db.attendance_stats(query.event_id)).await?;
    if query.event_id.is_some() && stats.is_empty() {
        return Err(ApiError::NotFound("event"));
    }
    Ok(Json(stats))
}
