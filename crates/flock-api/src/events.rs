use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use flock_types::api::{Claims, CreateEventRequest, EventQuery, UpdateEventRequest};
use flock_types::models::{Attendance, Event};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

fn check_window(starts_at: &DateTime<Utc>, ends_at: Option<&DateTime<Utc>>) -> ApiResult<()> {
    if ends_at.is_some_and(|end| end < starts_at) {
        return Err(ApiError::bad_request("ends_at must not be before starts_at"));
    }
    Ok(())
}

fn non_empty(value: String, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    let after = query.upcoming.unwrap_or(false).then(Utc::now);
    let category = query.category.filter(|c| !c.trim().is_empty());
    let events = blocking(&state, move |db| db.list_events(category.as_deref(), after.as_ref())).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    blocking(&state, move |db| db.get_event(event_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("event"))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    check_window(&req.starts_at, req.ends_at.as_ref())?;

    let event = Event {
        id: Uuid::new_v4(),
        title: non_empty(req.title, "title")?,
        description: req.description,
        category: non_empty(req.category, "category")?.to_lowercase(),
        location: req.location,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        created_by: Some(claims.sub),
        created_at: Utc::now(),
    };
    let created = blocking(&state, move |db| db.create_event(&event)).await?;

    info!("{} created event {} ({})", claims.sub, created.id, created.title);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> ApiResult<Json<Event>> {
    require_staff(&claims)?;
    let mut event = blocking(&state, move |db| db.get_event(event_id))
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    if let Some(title) = req.title {
        event.title = non_empty(title, "title")?;
    }
    if let Some(category) = req.category {
        event.category = non_empty(category, "category")?.to_lowercase();
    }
    if req.description.is_some() {
        event.description = req.description;
    }
    if req.location.is_some() {
        event.location = req.location;
    }
    if let Some(starts_at) = req.starts_at {
        event.starts_at = starts_at;
    }
    if req.ends_at.is_some() {
        event.ends_at = req.ends_at;
    }
    check_window(&event.starts_at, event.ends_at.as_ref())?;

    blocking(&state, move |db| {
        if !db.update_event(&event)? {
            return Ok(None);
        }
        db.get_event(event.id)
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("event"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff(&claims)?;
    if !blocking(&state, move |db| db.delete_event(event_id)).await? {
        return Err(ApiError::NotFound("event"));
    }
    info!("{} deleted event {}", claims.sub, event_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_attendance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Attendance>>> {
    require_staff(&claims)?;
    let rows = blocking(&state, move |db| {
        if db.get_event(event_id)?.is_none() {
            return Ok(None);
        }
        db.list_attendance(event_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn end_before_start_is_rejected() {
        let start = Utc::now();
        assert!(check_window(&start, None).is_ok());
        assert!(check_window(&start, Some(&start)).is_ok());
        assert!(check_window(&start, Some(&(start - Duration::minutes(1)))).is_err());
    }
}
