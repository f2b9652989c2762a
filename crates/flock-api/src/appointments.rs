use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use flock_types::api::{AppointmentStatusRequest, Claims, CreateAppointmentRequest};
use flock_types::models::{Appointment, AppointmentStatus, Role};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::state::{AppState, blocking};

/// Admins and office staff manage every booking; pastors and members only
/// their own.
fn manages_all(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Staff)
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let subject = req.subject.trim().to_string();
    if subject.is_empty() {
        return Err(ApiError::bad_request("subject is required"));
    }

    let member_id = claims.sub;
    let pastor_id = req.pastor_id;
    let appointment = blocking(&state, move |db| {
        let pastor = db.get_user(pastor_id)?;
        if !pastor.is_some_and(|p| p.role.can_counsel()) {
            return Ok(None);
        }
        db.create_appointment(
            Uuid::new_v4(),
            member_id,
            pastor_id,
            &subject,
            req.notes.as_deref(),
            &req.scheduled_at,
        )
        .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("pastor_id must refer to a pastor or admin"))?;

    info!("{} booked appointment {} with {}", member_id, appointment.id, pastor_id);
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let involving = (!manages_all(claims.role)).then_some(claims.sub);
    Ok(Json(blocking(&state, move |db| db.list_appointments(involving)).await?))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(appointment_id): Path<Uuid>,
    ApiJson(req): ApiJson<AppointmentStatusRequest>,
) -> ApiResult<Json<Appointment>> {
    let appointment = blocking(&state, move |db| db.get_appointment(appointment_id))
        .await?
        .ok_or(ApiError::NotFound("appointment"))?;

    let allowed = manages_all(claims.role)
        || appointment.pastor_id == claims.sub
        || (appointment.member_id == claims.sub && req.status == AppointmentStatus::Cancelled);
    if !allowed {
        return Err(ApiError::Forbidden);
    }

    let status = req.status;
    blocking(&state, move |db| {
        db.set_appointment_status(appointment_id, status)?;
        db.get_appointment(appointment_id)
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("appointment"))
}
