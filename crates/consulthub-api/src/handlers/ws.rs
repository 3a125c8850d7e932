//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use consulthub_core::error::AppError;
use consulthub_core::types::UserId;
use consulthub_realtime::connection::handle::OutboundFrame;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?user_id={id}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if !query.user_id.is_valid() {
        return Err(AppError::validation("Invalid user id").into());
    }

    let max_size = state.realtime.max_message_size();
    Ok(ws
        .max_message_size(max_size)
        .on_upgrade(move |socket| handle_socket(state, query.user_id, socket)))
}

/// Binds an established socket to the connection registry until either
/// side closes it.
async fn handle_socket(state: AppState, user_id: UserId, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound_rx) = state.realtime.connect(user_id);
    let conn_id = handle.id;

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection established");

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let message = match frame {
                OutboundFrame::Text(text) => Message::Text(text.into()),
                OutboundFrame::Ping => Message::Ping(Default::default()),
                OutboundFrame::Close => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            };
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.realtime.handle_text(user_id, text.as_str()).await;
            }
            Ok(Message::Pong(_)) => state.realtime.record_pong(user_id),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
        if !handle.is_alive() {
            debug!(conn_id = %conn_id, "Connection closed by the server");
            break;
        }
    }

    state.realtime.disconnect(&handle);
    writer.abort();

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}
