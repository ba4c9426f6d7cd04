//! Log Feed WebSocket Route
//!
//! Streams pipeline log events to connected dashboard clients. Events
//! emitted before a client connects are not replayed.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::feed::SubscriberHub;

/// Feed state shared across handlers
pub struct FeedState {
    pub hub: Arc<SubscriberHub>,
}

/// Create the log feed route
pub fn feed_routes(state: Arc<FeedState>) -> Router {
    Router::new()
        .route("/logs", get(logs_websocket_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn logs_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FeedState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_logs_socket(socket, state))
}

/// Handle an individual log feed connection.
///
/// Incoming client messages are drained and ignored; the socket is
/// send-only from the server's point of view. The subscriber is removed
/// from the hub when the connection closes for any reason.
async fn handle_logs_socket(socket: WebSocket, state: Arc<FeedState>) {
    let subscriber_id = Uuid::new_v4().to_string();
    let mut events = state.hub.add(&subscriber_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Keep-alives and stray client chatter are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.remove(&subscriber_id);
}
