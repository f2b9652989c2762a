use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use flock_types::api::{Claims, UpdateRoleRequest, UpdateUserRequest, UserQuery};
use flock_types::models::User;

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::middleware::{require_admin, require_self_or_staff, require_staff};
use crate::state::{AppState, blocking};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Json<Vec<User>>> {
    require_staff(&claims)?;
    let search = query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let users = blocking(&state, move |db| db.list_users(query.role, search.as_deref())).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_self_or_staff(&claims, user_id)?;
    blocking(&state, move |db| db.get_user(user_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    require_self_or_staff(&claims, user_id)?;

    let full_name = req.full_name.map(|n| n.trim().to_string());
    if full_name.as_deref() == Some("") {
        return Err(ApiError::bad_request("full_name cannot be empty"));
    }

    blocking(&state, move |db| {
        db.update_user(user_id, full_name.as_deref(), req.phone.as_deref())
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("user"))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> ApiResult<Json<User>> {
    require_admin(&claims)?;

    let role = req.role;
    let user = blocking(&state, move |db| {
        if !db.set_role(user_id, role)? {
            return Ok(None);
        }
        db.get_user(user_id)
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    info!("{} set role of {} to {}", claims.sub, user_id, role);
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&claims)?;
    if user_id == claims.sub {
        return Err(ApiError::bad_request("admins cannot delete their own account"));
    }

    if !blocking(&state, move |db| db.delete_user(user_id)).await? {
        return Err(ApiError::NotFound("user"));
    }
    info!("{} deleted user {}", claims.sub, user_id);
    Ok(StatusCode::NO_CONTENT)
}
