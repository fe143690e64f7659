use std::sync::{Arc, atomic::Ordering::Relaxed};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    common::{errors::ApiError, types::UserId},
    gateway::ConnectionHandler,
    protocol::{InboundFrame, OutgoingMessage},
    server::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

/// Query parameter first, then the `User-Id` header. Blank values count as
/// missing.
pub fn extract_user_id(params: &ConnectParams, headers: &HeaderMap) -> Option<UserId> {
    let from_query = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    from_query
        .or_else(|| {
            headers
                .get("user-id")
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .map(UserId::from)
}

pub async fn websocket_handler(
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(user_id) = extract_user_id(&params, &headers) else {
        warn!("Rejected control channel: missing user id");
        return ApiError::bad_request("Missing user_id query parameter or User-Id header", "/ws")
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (out_tx, out_rx) = flume::unbounded::<OutgoingMessage>();
    let (cmd_tx, cmd_rx) = flume::unbounded::<InboundFrame>();

    let handler = Arc::new(ConnectionHandler::new(
        user_id,
        state.services.clone(),
        out_tx,
    ));
    let conn_id = handler.connection_id().clone();
    state.connections.fetch_add(1, Relaxed);
    info!(
        "Control channel opened: user={} conn={}",
        handler.user_id(),
        conn_id
    );

    let (mut sink, mut stream) = socket.split();

    // Ends once every sender is gone, i.e. after the worker drops the handler.
    tokio::spawn(async move {
        while let Ok(msg) = out_rx.recv_async().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode outgoing message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                debug!("Control channel write failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Commands run one at a time in arrival order.
    let worker_handler = handler.clone();
    tokio::spawn(async move {
        while let Ok(frame) = cmd_rx.recv_async().await {
            if worker_handler.is_closed() {
                break;
            }
            worker_handler.handle_frame(frame).await;
        }
    });

    loop {
        let next = tokio::select! {
            _ = state.shutdown.cancelled() => {
                debug!("Closing control channel for shutdown: conn={}", conn_id);
                break;
            }
            next = stream.next() => next,
        };
        let Some(msg) = next else {
            break;
        };
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Control channel read failed: conn={} err={}", conn_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<InboundFrame>(text.as_str()) {
                Ok(frame) => {
                    if cmd_tx.send(frame).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Malformed frame, closing: conn={} err={}", conn_id, e);
                    break;
                }
            },
            Message::Binary(_) => {
                debug!("Ignoring binary frame: conn={}", conn_id);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handler.disconnect();
    drop(cmd_tx);
    state.connections.fetch_sub(1, Relaxed);
    info!("Control channel closed: conn={}", conn_id);
}
