use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::message::FeedMessage;
use crate::presentation::rest::AppState;
use crate::shared::utils::generate_id;

/// Handle WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push every feed event to one client until either side goes away.
/// Inbound frames carry no commands and are only drained.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client_id = generate_id();
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = state.hub.subscribe().await;
    info!(client = %client_id, subscribers = state.hub.subscriber_count(), "🔌 Client connected");

    let send_client = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            let json = match serde_json::to_string(&FeedMessage::from(event.as_ref())) {
                Ok(json) => json,
                Err(e) => {
                    warn!(client = %send_client, error = %e, "Failed to encode feed frame");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_client = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                other => debug!(client = %recv_client, ?other, "Ignoring inbound frame"),
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(client = %client_id, "Client disconnected");
}
