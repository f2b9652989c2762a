use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use flock_types::api::{Claims, CreateSermonRequest, SermonQuery};
use flock_types::models::Sermon;

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

pub async fn list_sermons(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SermonQuery>,
) -> ApiResult<Json<Vec<Sermon>>> {
    let sermons = blocking(&state, move |db| {
        db.list_sermons(query.series.as_deref(), query.speaker.as_deref())
    })
    .await?;
    Ok(Json(sermons))
}

pub async fn get_sermon(
    State(state): State<AppState>,
    Path(sermon_id): Path<Uuid>,
) -> ApiResult<Json<Sermon>> {
    blocking(&state, move |db| db.get_sermon(sermon_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("sermon"))
}

pub async fn create_sermon(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateSermonRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    let title = req.title.trim().to_string();
    let speaker = req.speaker.trim().to_string();
    if title.is_empty() || speaker.is_empty() {
        return Err(ApiError::bad_request("title and speaker are required"));
    }

    let sermon = Sermon {
        id: Uuid::new_v4(),
        title,
        speaker,
        series: req.series,
        scripture: req.scripture,
        media_url: req.media_url,
        preached_on: req.preached_on,
        created_at: Utc::now(),
    };
    let created = blocking(&state, move |db| db.create_sermon(&sermon)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_sermon(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(sermon_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff(&claims)?;
    if !blocking(&state, move |db| db.delete_sermon(sermon_id)).await? {
        return Err(ApiError::NotFound("sermon"));
    }
    Ok(StatusCode::NO_CONTENT)
}
