use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use flock_types::api::{ApproveRequest, Claims, CreateCommentRequest, CreateTestimonyRequest, LikeResponse};
use flock_types::events::GatewayEvent;
use flock_types::models::{Testimony, TestimonyComment};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

const MAX_COMMENT_LEN: usize = 2000;

pub async fn create_testimony(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateTestimonyRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    if title.is_empty() || req.body.trim().is_empty() {
        return Err(ApiError::bad_request("title and body are required"));
    }

    // Staff posts skip moderation.
    let approved = claims.role.is_staff();
    let author = claims.sub;
    let testimony = blocking(&state, move |db| {
        db.create_testimony(Uuid::new_v4(), author, &title, &req.body, approved)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(testimony)))
}

pub async fn list_testimonies(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Testimony>>> {
    let viewer = claims.sub;
    let include_unapproved = claims.role.is_staff();
    Ok(Json(
        blocking(&state, move |db| db.list_testimonies(viewer, include_unapproved)).await?,
    ))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(testimony_id): Path<Uuid>,
    ApiJson(req): ApiJson<ApproveRequest>,
) -> ApiResult<Json<Testimony>> {
    require_staff(&claims)?;
    let viewer = claims.sub;
    blocking(&state, move |db| {
        if !db.set_testimony_approved(testimony_id, req.approved)? {
            return Ok(None);
        }
        db.get_testimony(testimony_id, viewer)
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("testimony"))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(testimony_id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    let testimony = visible_testimony(&state, &claims, testimony_id).await?;
    let user_id = claims.sub;
    let toggle = blocking(&state, move |db| db.toggle_testimony_like(testimony.id, user_id))
        .await?
        .ok_or(ApiError::NotFound("testimony"))?;

    state.dispatcher.broadcast(GatewayEvent::TestimonyLikeUpdate {
        testimony_id,
        likes_count: toggle.count,
    });

    Ok(Json(LikeResponse {
        liked: toggle.active,
        likes_count: toggle.count,
    }))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(testimony_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TestimonyComment>>> {
    visible_testimony(&state, &claims, testimony_id).await?;
    Ok(Json(blocking(&state, move |db| db.list_comments(testimony_id)).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(testimony_id): Path<Uuid>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::bad_request("comment must be 1-2000 characters"));
    }
    visible_testimony(&state, &claims, testimony_id).await?;

    let author = claims.sub;
    let comment = blocking(&state, move |db| db.add_comment(Uuid::new_v4(), testimony_id, author, &body)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Unapproved testimonies are only reachable by their author and staff; for
/// everyone else they do not exist.
async fn visible_testimony(state: &AppState, claims: &Claims, id: Uuid) -> ApiResult<Testimony> {
    let viewer = claims.sub;
    let testimony = blocking(state, move |db| db.get_testimony(id, viewer))
        .await?
        .ok_or(ApiError::NotFound("testimony"))?;
    if testimony.approved || testimony.author_id == claims.sub || claims.role.is_staff() {
        Ok(testimony)
    } else {
        Err(ApiError::NotFound("testimony"))
    }
}
