//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionIdFactory, Timestamp},
    ui::{gateway::ConnectionState, state::AppState},
};

/// How long queued replies may take to flush once the peer stops reading
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionIdFactory::generate();

    // Outbound frames for this connection are queued here by the pusher
    let (tx, mut rx) = mpsc::channel::<String>(state.outbound_buffer);
    state.pusher.register(connection_id, tx).await;
    tracing::info!(
        "Connection '{}' opened ({} connected)",
        connection_id,
        state.pusher.count_connected_clients().await
    );

    let (mut sender, mut receiver) = socket.split();
    let gateway = state.gateway.clone();

    let mut recv_task = tokio::spawn(async move {
        let mut connection_state = ConnectionState::AwaitingJoin;
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    match gateway
                        .handle_text(&connection_id, connection_state, text.as_str())
                        .await
                    {
                        Ok(ConnectionState::Closed) => {
                            tracing::info!("Connection '{}' left", connection_id);
                            break;
                        }
                        Ok(next) => connection_state = next,
                        Err(e) => {
                            tracing::warn!("Closing connection '{}': {}", connection_id, e);
                            break;
                        }
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!(
                        "Closing connection '{}': binary frames are not part of the protocol",
                        connection_id
                    );
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // A dead writer ends the reader; a finished reader lets the writer drain
    let reader_finished = tokio::select! {
        _ = &mut recv_task => true,
        _ = &mut send_task => {
            recv_task.abort();
            false
        }
    };

    // Dropping the registered sender closes the queue once it is empty
    if let Some(connected_at) = state.pusher.unregister(&connection_id).await {
        tracing::debug!(
            "Connection '{}' was open for {} ms",
            connection_id,
            Timestamp::now().value() - connected_at.value()
        );
    }
    state.gateway.close(&connection_id).await;

    if reader_finished
        && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task)
            .await
            .is_err()
    {
        tracing::warn!(
            "Dropping unsent frames for '{}' after {:?}",
            connection_id,
            FLUSH_TIMEOUT
        );
        send_task.abort();
    }
    tracing::info!("Connection '{}' closed", connection_id);
}
