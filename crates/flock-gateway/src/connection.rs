use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use flock_types::api::Claims;
use flock_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Server sends a Ping every 15 seconds. Two missed Pongs (~30s) drop the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Time a fresh socket has to send `Identify`.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type Subscriptions = Arc<RwLock<HashSet<Uuid>>>;

/// Drives one WebSocket client from the Identify handshake until it disconnects.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let Some(claims) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        let _ = sender.send(Message::Close(None)).await;
        return;
    };
    let user_id = claims.sub;

    info!("{} ({}) connected to gateway", claims.email, user_id);

    let ready = GatewayEvent::Ready { user_id, email: claims.email.clone() };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    // Let the newcomer see who is already here before announcing it.
    for uid in dispatcher.online_users().await {
        let event = GatewayEvent::PresenceUpdate { user_id: uid, online: true };
        if !send_event(&mut sender, &event).await {
            return;
        }
    }

    let broadcast_rx = dispatcher.subscribe();
    dispatcher.user_online(user_id).await;

    let subscriptions: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
    let pong_received = Arc::new(AtomicBool::new(true));

    let mut send_task = tokio::spawn(forward_events(
        sender,
        broadcast_rx,
        subscriptions.clone(),
        pong_received.clone(),
    ));

    let dispatcher_recv = dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher_recv, user_id, cmd, &subscriptions),
                    Err(e) => warn!(
                        "{} bad command: {} -- raw: {}",
                        user_id,
                        e,
                        text.chars().take(200).collect::<String>()
                    ),
                },
                Message::Pong(_) => pong_received.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.user_offline(user_id).await;
    info!("{} ({}) disconnected from gateway", claims.email, user_id);
}

/// Relays dispatcher events to the client and runs the heartbeat.
async fn forward_events(
    mut sender: SplitSink<WebSocket, Message>,
    mut broadcast_rx: tokio::sync::broadcast::Receiver<GatewayEvent>,
    subscriptions: Subscriptions,
    pong_received: Arc<AtomicBool>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed: u8 = 0;

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                let event = match result {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Broadcast receiver lagged by {} messages", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if !should_deliver(&event, &subscriptions) {
                    continue;
                }
                if !send_event(&mut sender, &event).await {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if pong_received.swap(false, Ordering::Acquire) {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= MAX_MISSED_PONGS {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed);
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Channel-scoped events reach only connections subscribed to that channel.
fn should_deliver(event: &GatewayEvent, subscriptions: &Subscriptions) -> bool {
    match event.channel_id() {
        Some(channel_id) => subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&channel_id),
        None => true,
    }
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

/// Returns the claims of the first valid `Identify` received within the timeout.
async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else { continue };
            if let Ok(GatewayCommand::Identify { token }) = serde_json::from_str(&text) {
                return decode::<Claims>(
                    &token,
                    &DecodingKey::from_secret(jwt_secret.as_bytes()),
                    &Validation::default(),
                )
                .ok()
                .map(|data| data.claims);
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

fn handle_command(dispatcher: &Dispatcher, user_id: Uuid, cmd: GatewayCommand, subscriptions: &Subscriptions) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { channel_ids } => {
            debug!("{} subscribing to {} channels", user_id, channel_ids.len());
            let mut subs = subscriptions.write().unwrap_or_else(PoisonError::into_inner);
            *subs = channel_ids.into_iter().collect();
        }

        GatewayCommand::StartTyping { channel_id } => {
            dispatcher.broadcast(GatewayEvent::TypingStart { channel_id, user_id });
        }
    }
}
