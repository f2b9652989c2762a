use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use flock_types::api::{
    CheckInRequest, CheckInResponse, Claims, DataSource, FaceEnrollRequest, FaceMatch,
    FaceRecognitionResult, RecognizeRequest, RecognizeResponse, RecognizedMember,
};
use flock_types::models::{AttendanceMethod, User};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

/// Rejects empty or non-base64 image payloads.
fn validate_image(image_base64: &str) -> ApiResult<()> {
    match B64.decode(image_base64.trim()) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        _ => Err(ApiError::bad_request("image_base64 must be non-empty base64")),
    }
}

/// Keeps matches at or above `min_confidence`, one per user (the best score).
fn confident_matches(matches: Vec<FaceMatch>, min_confidence: f64) -> Vec<FaceMatch> {
    let mut best: HashMap<Uuid, f64> = HashMap::new();
    for m in matches.into_iter().filter(|m| m.confidence >= min_confidence) {
        let entry = best.entry(m.user_id).or_insert(m.confidence);
        if m.confidence > *entry {
            *entry = m.confidence;
        }
    }
    let mut out: Vec<FaceMatch> = best
        .into_iter()
        .map(|(user_id, confidence)| FaceMatch { user_id, confidence })
        .collect();
    out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    out
}

/// Manual check-in. Members check themselves in; staff may check in anyone.
pub async fn check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CheckInRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = req.user_id.unwrap_or(claims.sub);
    if user_id != claims.sub {
        require_staff(&claims)?;
    }

    let event_id = req.event_id;
    let (attendance, newly_checked_in) = blocking(&state, move |db| {
        if db.get_event(event_id)?.is_none() {
            return Ok(Err(ApiError::NotFound("event")));
        }
        if db.get_user(user_id)?.is_none() {
            return Ok(Err(ApiError::NotFound("user")));
        }
        db.check_in(event_id, user_id, AttendanceMethod::Manual, None).map(Ok)
    })
    .await??;

    let status = if newly_checked_in { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(CheckInResponse { attendance, newly_checked_in })))
}

/// Sends a photo to the remote recognizer and checks in every confident match.
pub async fn recognize(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<RecognizeRequest>,
) -> ApiResult<Json<RecognizeResponse>> {
    require_staff(&claims)?;
    validate_image(&req.image_base64)?;

    let event_id = req.event_id;
    if blocking(&state, move |db| db.get_event(event_id)).await?.is_none() {
        return Err(ApiError::NotFound("event"));
    }

    let body = json!({ "event_id": event_id, "image": req.image_base64.trim() });
    let (source, result) = match state
        .remote
        .post_json::<_, FaceRecognitionResult>("/face/recognize", &body)
        .await
    {
        Ok(result) => (DataSource::Remote, result),
        Err(e) => {
            warn!("Face recognition unavailable, no matches recorded: {}", e);
            (DataSource::Mock, FaceRecognitionResult::default())
        }
    };

    let matches = confident_matches(result.matches, state.face_min_confidence);
    let recognized = blocking(&state, move |db| {
        let mut out = Vec::with_capacity(matches.len());
        for m in matches {
            let Some(user) = db.get_user(m.user_id)? else {
                continue;
            };
            let (_, newly) = db.check_in(event_id, user.id, AttendanceMethod::Face, Some(m.confidence))?;
            out.push(RecognizedMember {
                user_id: user.id,
                full_name: user.full_name,
                confidence: m.confidence,
                newly_checked_in: newly,
            });
        }
        Ok(out)
    })
    .await?;

    info!("Recognized {} member(s) at event {}", recognized.len(), event_id);
    Ok(Json(RecognizeResponse { event_id, source, recognized }))
}

/// Registers a member's face with the remote recognizer. No fallback exists.
pub async fn enroll_face(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    ApiJson(req): ApiJson<FaceEnrollRequest>,
) -> ApiResult<Json<User>> {
    require_staff(&claims)?;
    validate_image(&req.image_base64)?;

    if blocking(&state, move |db| db.get_user(user_id)).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    let body = json!({ "user_id": user_id, "image": req.image_base64.trim() });
    state
        .remote
        .post("/face/enroll", &body)
        .await
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;

    let user = blocking(&state, move |db| {
        db.set_face_enrolled(user_id, true)?;
        db.get_user(user_id)
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    info!("Enrolled face for {}", user_id);
    Ok(Json(user))
}
