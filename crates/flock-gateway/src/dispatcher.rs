use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use flock_types::events::GatewayEvent;

/// Fans gateway events out to every connected client and tracks who is online.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection holds a receiver; channel filtering happens per connection.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// user_id -> number of open connections for that user
    online_users: RwLock<HashMap<Uuid, usize>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                online_users: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Send an event to all connected clients. A send with nobody listening is
    /// not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Registers one more connection for `user_id`. Presence is broadcast only
    /// when this is the user's first connection.
    pub async fn user_online(&self, user_id: Uuid) {
        let first = {
            let mut online = self.inner.online_users.write().await;
            let count = online.entry(user_id).or_insert(0);
            *count += 1;
            *count == 1
        };

        if first {
            self.broadcast(GatewayEvent::PresenceUpdate { user_id, online: true });
        }
    }

    /// Drops one connection for `user_id`; the user goes offline with the last one.
    pub async fn user_offline(&self, user_id: Uuid) {
        let last = {
            let mut online = self.inner.online_users.write().await;
            match online.get_mut(&user_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    online.remove(&user_id);
                    true
                }
                None => false,
            }
        };

        if last {
            self.broadcast(GatewayEvent::PresenceUpdate { user_id, online: false });
        }
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.online_users.read().await.keys().copied().collect()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.online_users.read().await.contains_key(&user_id)
    }
}
