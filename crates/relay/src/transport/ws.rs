// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client WebSocket endpoint: inbound requests in, broadcast responses out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::messages::{Frame, USER_NAME_EVENT};
use crate::state::RelayState;
use crate::transport::auth;

/// Query parameters for the WS upgrade.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserName {
    name: String,
}

/// `GET /ws`: WebSocket upgrade for a relay client.
pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if let Err(code) =
        auth::validate_ws_token(query.token.as_deref(), state.config.auth_token.as_deref())
    {
        return code.to_http_response("unauthorized").into_response();
    }

    ws.on_upgrade(move |socket| handle_connection(state, socket)).into_response()
}

/// Per-connection event loop.
async fn handle_connection(state: Arc<RelayState>, socket: WebSocket) {
    let id = uuid::Uuid::new_v4().to_string();
    // Subscribe before registering so a connection counted online never
    // misses a broadcast.
    let mut hub_rx = state.hub.subscribe();
    state.presence.connect(&id).await;
    tracing::info!(conn = %id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            frame = hub_rx.recv() => {
                let frame = match frame {
                    Ok(f) => f,
                    Err(RecvError::Lagged(n)) => {
                        tracing::debug!(conn = %id, lagged = n, "client lagged, skipping frames");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                match frame.to_text() {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(event = %frame.event, err = %e, "failed to encode frame"),
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_client_frame(&state, &id, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.presence.disconnect(&id).await;
    tracing::info!(conn = %id, "client disconnected");
}

/// Handle one text frame from a client.
///
/// Requests are only dispatched once the connection has announced a name.
async fn handle_client_frame(state: &RelayState, id: &str, text: &str) {
    let frame = match serde_json::from_str::<Frame>(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(conn = %id, err = %e, "ignoring unparseable frame");
            return;
        }
    };

    if frame.event == USER_NAME_EVENT {
        match serde_json::from_value::<UserName>(frame.data) {
            Ok(user) => {
                state.presence.set_name(id, &user.name).await;
                tracing::info!(conn = %id, name = %user.name, "client named");
            }
            Err(e) => tracing::debug!(conn = %id, err = %e, "ignoring bad name frame"),
        }
    } else if frame.event == state.names.request {
        if !state.presence.is_named(id).await {
            tracing::debug!(conn = %id, "request before name announcement, ignoring");
            return;
        }
        let _ = state.dispatcher.dispatch_value(&frame.data);
    } else {
        tracing::debug!(conn = %id, event = %frame.event, "ignoring unknown event");
    }
}
