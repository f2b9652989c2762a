use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, email: String },

    /// A new message was posted to a channel
    MessageCreate(Message),

    /// A user started typing
    TypingStart { channel_id: Uuid, user_id: Uuid },

    /// A user came online or went offline
    PresenceUpdate { user_id: Uuid, online: bool },

    /// Support count of a prayer request changed
    PrayerSupportUpdate { prayer_id: Uuid, support_count: i64 },

    /// Like count of a testimony changed
    TestimonyLikeUpdate { testimony_id: Uuid, likes_count: i64 },
}

impl GatewayEvent {
    /// Returns the channel_id if this event is scoped to a specific channel.
    /// Events that return `None` are global and delivered to every client.
    pub fn channel_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageCreate(message) => Some(message.channel_id),
            Self::TypingStart { channel_id, .. } => Some(*channel_id),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace the set of channels this connection receives events for
    Subscribe { channel_ids: Vec<Uuid> },

    /// Indicate typing in a channel
    StartTyping { channel_id: Uuid },
}
