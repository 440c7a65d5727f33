//! Live refresh feed
//!
//! A WebSocket connection is a notifier subscription for as long as it stays
//! open. Every [`RefreshSignal`](crate::notifier::RefreshSignal) is forwarded
//! as one JSON text frame; anything the client sends is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use super::handlers::AppState;
use crate::notifier::ChangeNotifier;

pub async fn refresh_socket(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let notifier = Arc::clone(&state.notifier);
    ws.on_upgrade(move |socket| forward_signals(socket, notifier))
}

async fn forward_signals(socket: WebSocket, notifier: Arc<ChangeNotifier>) {
    let mut subscription = notifier.subscribe();
    let subscriber = subscription.id();
    debug!(subscriber, "websocket subscribed");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            signal = subscription.recv() => {
                let Some(signal) = signal else { break };
                let text = match serde_json::to_string(&signal) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(subscriber, error = %err, "failed to encode refresh signal");
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Dropping the subscription unsubscribes.
    drop(subscription);
    debug!(subscriber, "websocket closed");
}
