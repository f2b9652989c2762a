use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use flock_types::api::Claims;
use flock_types::models::Role;

use crate::auth::decode_token;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking};

/// Raw-token header accepted alongside `Authorization: Bearer`.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Validates the caller's JWT and stores its [`Claims`] in the request extensions.
///
/// The account must still exist, and its current role replaces the one baked
/// into the token so promotions and demotions apply immediately.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let mut claims = decode_token(&state.jwt_secret, token).map_err(|_| ApiError::Unauthorized)?;

    let user_id = claims.sub;
    let user = blocking(&state, move |db| db.get_user(user_id))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    claims.role = user.role;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return value.strip_prefix("Bearer ").map(str::trim);
    }
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// -- Role checks --

pub fn require_staff(claims: &Claims) -> ApiResult<()> {
    if claims.role.is_staff() { Ok(()) } else { Err(ApiError::Forbidden) }
}

pub fn require_admin(claims: &Claims) -> ApiResult<()> {
    if claims.role == Role::Admin { Ok(()) } else { Err(ApiError::Forbidden) }
}

pub fn require_self_or_staff(claims: &Claims, user_id: Uuid) -> ApiResult<()> {
    if claims.sub == user_id || claims.role.is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
