use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::RestaurantContext;
use crate::orders::live::LiveOrderHub;
use crate::router::AppState;

/// Pushes the restaurant's change events to an open floor or orders page.
pub async fn live_socket(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    ws: WebSocketUpgrade,
) -> Response {
    let restaurant_id = ctx.id();
    let hub = state.live.clone();
    ws.on_upgrade(move |socket| forward_events(socket, hub, restaurant_id))
}

async fn forward_events(socket: WebSocket, hub: LiveOrderHub, restaurant_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe(restaurant_id);
    debug!(%restaurant_id, subscribers = hub.subscriber_count(restaurant_id), "live page connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // The page re-fetches its whole list on the next event anyway.
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%restaurant_id, skipped, "live subscriber lagged");
                    let resync = r#"{"type":"resync"}"#;
                    if sender.send(Message::Text(resync.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!(%restaurant_id, "live page disconnected");
}
