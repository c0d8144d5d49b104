//! Chat WebSocket handler.
//!
//! The socket is split: a writer task drains the connection's outbox into
//! text frames while the reader feeds client frames to the session one at a
//! time. Authentication happens in-band with the `authenticate` event. A
//! connection evicted for letting its outbox fill up is hung up.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::chat::OutboxReceiver;
use crate::web::handlers::AppState;

/// GET /ws - Upgrade to a chat connection.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut session, outbox) = state.hub.connect();
    let connection = session.id();
    let eviction = session.eviction_signal();
    let (ws_sender, mut ws_receiver) = socket.split();

    let mut writer = tokio::spawn(write_events(ws_sender, outbox));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => session.handle_frame(&text).await,
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(connection = %connection, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection = %connection, "WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection = %connection, "WebSocket error: {}", e);
                        break;
                    }
                }
            }
            _ = eviction.wait() => {
                tracing::info!(connection = %connection, "Closing connection that fell behind");
                break;
            }
            _ = &mut writer => {
                tracing::debug!(connection = %connection, "WebSocket writer finished");
                break;
            }
        }
    }

    session.close().await;
    writer.abort();
}

async fn write_events(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut outbox: OutboxReceiver,
) {
    while let Some(event) = outbox.recv().await {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                continue;
            }
        };
        if ws_sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    let _ = ws_sender.close().await;
}
