use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use flock_types::api::{Claims, CreateChannelRequest, SendMessageRequest};
use flock_types::events::GatewayEvent;
use flock_types::models::{Channel, Message};

use flock_db::Database;
use flock_db::models::MessageCursor;

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

const MAX_CHANNEL_NAME: usize = 32;
const MAX_MESSAGE_LEN: usize = 4000;
const MAX_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Id of the oldest message already seen, or a timestamp; only older
    /// messages are returned.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

fn valid_channel_name(name: &str) -> bool {
    (1..=MAX_CHANNEL_NAME).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

pub async fn list_channels(State(state): State<AppState>) -> ApiResult<Json<Vec<Channel>>> {
    Ok(Json(blocking(&state, |db| db.list_channels()).await?))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateChannelRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    let name = req.name.trim().to_string();
    if !valid_channel_name(&name) {
        return Err(ApiError::bad_request(
            "channel name must be 1-32 characters of lowercase letters, digits and '-'",
        ));
    }

    let channel = blocking(&state, move |db| {
        if db.get_channel_by_name(&name)?.is_some() {
            return Ok(None);
        }
        db.create_channel(Uuid::new_v4(), &name, req.description.as_deref()).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("channel name already taken".into()))?;

    Ok((StatusCode::CREATED, Json(channel)))
}

/// All members can read and post in every channel.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(channel_id): Path<Uuid>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request("message must be 1-4000 characters"));
    }

    let author = claims.sub;
    let message = blocking(&state, move |db| {
        if db.get_channel(channel_id)?.is_none() {
            return Ok(None);
        }
        db.insert_message(Uuid::new_v4(), channel_id, author, &body).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("channel"))?;

    state.dispatcher.broadcast(GatewayEvent::MessageCreate(message.clone()));

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    ApiQuery(query): ApiQuery<MessageQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    let limit = query.limit.clamp(1, MAX_PAGE);
    let before = query.before.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty());

    let messages = blocking(&state, move |db| {
        if db.get_channel(channel_id)?.is_none() {
            return Ok(Err(ApiError::NotFound("channel")));
        }
        let cursor = match before {
            None => None,
            Some(raw) => match resolve_cursor(db, channel_id, &raw)? {
                Some(cursor) => Some(cursor),
                None => {
                    return Ok(Err(ApiError::bad_request(
                        "before must be a message id from this channel or a timestamp",
                    )));
                }
            },
        };
        db.get_messages(channel_id, limit, cursor.as_ref()).map(Ok)
    })
    .await??;

    Ok(Json(messages))
}

fn resolve_cursor(db: &Database, channel_id: Uuid, raw: &str) -> anyhow::Result<Option<MessageCursor>> {
    if let Ok(message_id) = raw.parse::<Uuid>() {
        return db.message_cursor(channel_id, message_id);
    }
    Ok(flock_db::parse_ts(raw).map(|ts| MessageCursor::at_time(flock_db::format_ts(&ts))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names() {
        assert!(valid_channel_name("prayer-chain"));
        assert!(valid_channel_name("youth2026"));
        assert!(!valid_channel_name(""));
        assert!(!valid_channel_name("Youth"));
        assert!(!valid_channel_name("a b"));
        assert!(!valid_channel_name(&"x".repeat(33)));
    }
}
