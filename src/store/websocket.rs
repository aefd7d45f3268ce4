use crate::store::registry::SubscriptionRegistry;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shared state for the WebSocket handler
pub struct WsAppState {
    pub registry: Arc<SubscriptionRegistry>,
}

/// Create the live-subscription router
pub fn create_ws_router(state: Arc<WsAppState>) -> Router {
    Router::new()
        .route("/ws/:user_id", get(ws_handler))
        .with_state(state)
}

/// GET /ws/:user_id - WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<i64>,
    State(state): State<Arc<WsAppState>>,
) -> Response {
    info!(user_id, "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Connection lifecycle: register under the user id, then stream matching
/// records until the client disconnects, the transport errors, or the
/// receiver lags past the channel capacity. Inbound text frames are client
/// keep-alives and are ignored.
async fn handle_socket(mut socket: WebSocket, user_id: i64, state: Arc<WsAppState>) {
    let mut rx = state.registry.subscribe(user_id);
    info!(user_id, "subscriber active");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(_))) => {
                        // Keep-alive, ignored
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(user_id, "subscriber disconnected");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!(user_id, error = %e, "WebSocket transport error");
                        break;
                    }
                }
            }

            result = rx.recv() => {
                match result {
                    Ok(record) => {
                        let json = match serde_json::to_string(&record) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(user_id, error = %e, "failed to encode record");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            warn!(user_id, "failed to deliver record; closing");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // A subscriber that cannot keep up is dropped rather
                        // than allowed to stall or silently miss records.
                        warn!(user_id, skipped, "subscriber lagged; closing");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    drop(rx);
    state.registry.prune(user_id);
    info!(user_id, "subscriber closed");
}
