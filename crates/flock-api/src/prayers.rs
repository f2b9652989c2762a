use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use flock_types::api::{Claims, CreatePrayerRequest, PrayerQuery, PrayerStatusRequest, SupportResponse};
use flock_types::events::GatewayEvent;
use flock_types::models::Prayer;

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::state::{AppState, blocking};

/// Hides who posted an anonymous prayer from everyone but its author and staff.
fn mask_for(claims: &Claims, mut prayer: Prayer) -> Prayer {
    let is_author = prayer.author_id == Some(claims.sub);
    if prayer.is_anonymous && !is_author && !claims.role.is_staff() {
        prayer.author_id = None;
        prayer.author_name = None;
    }
    prayer
}

pub async fn create_prayer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePrayerRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    if title.is_empty() || req.body.trim().is_empty() {
        return Err(ApiError::bad_request("title and body are required"));
    }

    let author = claims.sub;
    let prayer = blocking(&state, move |db| {
        db.create_prayer(Uuid::new_v4(), author, &title, &req.body, req.is_anonymous)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(prayer)))
}

pub async fn list_prayers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PrayerQuery>,
) -> ApiResult<Json<Vec<Prayer>>> {
    let viewer = claims.sub;
    let prayers = blocking(&state, move |db| db.list_prayers(query.status, viewer)).await?;
    Ok(Json(prayers.into_iter().map(|p| mask_for(&claims, p)).collect()))
}

pub async fn get_prayer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(prayer_id): Path<Uuid>,
) -> ApiResult<Json<Prayer>> {
    let viewer = claims.sub;
    let prayer = blocking(&state, move |db| db.get_prayer(prayer_id, viewer))
        .await?
        .ok_or(ApiError::NotFound("prayer"))?;
    Ok(Json(mask_for(&claims, prayer)))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(prayer_id): Path<Uuid>,
    ApiJson(req): ApiJson<PrayerStatusRequest>,
) -> ApiResult<Json<Prayer>> {
    let viewer = claims.sub;
    let prayer = blocking(&state, move |db| db.get_prayer(prayer_id, viewer))
        .await?
        .ok_or(ApiError::NotFound("prayer"))?;
    if prayer.author_id != Some(claims.sub) && !claims.role.is_staff() {
        return Err(ApiError::Forbidden);
    }

    let status = req.status;
    let updated = blocking(&state, move |db| {
        db.set_prayer_status(prayer_id, status)?;
        db.get_prayer(prayer_id, viewer)
    })
    .await?
    .ok_or(ApiError::NotFound("prayer"))?;
    Ok(Json(mask_for(&claims, updated)))
}

/// Adds the caller's support, or withdraws it if already given.
pub async fn toggle_support(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(prayer_id): Path<Uuid>,
) -> ApiResult<Json<SupportResponse>> {
    let user_id = claims.sub;
    let toggle = blocking(&state, move |db| db.toggle_prayer_support(prayer_id, user_id))
        .await?
        .ok_or(ApiError::NotFound("prayer"))?;

    state.dispatcher.broadcast(GatewayEvent::PrayerSupportUpdate {
        prayer_id,
        support_count: toggle.count,
    });

    Ok(Json(SupportResponse {
        supported: toggle.active,
        support_count: toggle.count,
    }))
}
