//! WebSocket connection handlers.
//!
//! Each connection goes through three phases:
//!
//! 1. join: register with the registry and load the recent history
//! 2. replay: write the history straight to the socket, oldest first
//! 3. live: a receive task persists and broadcasts inbound messages while the
//!    outbound pump forwards broadcasts from the connection's queue
//!
//! Broadcasts that arrive during replay wait in the queue. `LiveFeed` skips any
//! of them that the replay already covered.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::oneshot;

use crate::{
    domain::{ChatMessage, ConnectionId, SenderName},
    infrastructure::dto::websocket::{ChatMessageDto, ProtocolViolation, parse_inbound},
    ui::state::AppState,
    usecase::{LiveFeed, SendMessageError},
};

/// Why a session ended
#[derive(Debug)]
enum SessionEnd {
    /// The client sent a close frame or the stream ended
    ClientClosed,
    /// The client sent something outside the protocol
    ProtocolViolation(ProtocolViolation),
    /// The outbound queue was closed (evicted or server shutdown)
    Deregistered,
    /// Reading from or writing to the socket failed
    Transport(String),
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, receiver) = socket.split();

    // 1. join
    let joined = match state.connect_participant_usecase.execute().await {
        Ok(joined) => joined,
        Err(e) => {
            tracing::error!("Rejecting connection: {}", e);
            let _ = sender
                .send(close_message(close_code::ERROR, "history unavailable"))
                .await;
            return;
        }
    };
    let id = joined.id;
    tracing::info!("'{}' connected, replaying {} message(s)", id, joined.history.len());

    // 2. replay
    for message in joined.history {
        if let Err(e) = send_chat_message(&mut sender, message).await {
            tracing::warn!("Failed to replay history to '{}': {}", id, e);
            state.disconnect_participant_usecase.execute(id).await;
            return;
        }
    }

    // 3. live
    if !state.connect_participant_usecase.mark_live(id).await {
        tracing::warn!("'{}' was deregistered during replay", id);
    }

    let (close_tx, close_rx) = oneshot::channel();
    let mut recv_task = receive_loop(receiver, state.clone(), id, close_tx);
    let mut send_task = pusher_loop(joined.live, sender, close_rx);

    // If any one of the tasks completes, stop the other
    let end = tokio::select! {
        end = &mut recv_task => {
            let end = end.unwrap_or_else(|e| SessionEnd::Transport(e.to_string()));
            match end {
                // The pump sends the close frame and then stops
                SessionEnd::ProtocolViolation(_) => {
                    let _ = (&mut send_task).await;
                }
                _ => send_task.abort(),
            }
            end
        }
        end = &mut send_task => {
            recv_task.abort();
            end.unwrap_or_else(|e| SessionEnd::Transport(e.to_string()))
        }
    };

    match &end {
        SessionEnd::ClientClosed | SessionEnd::Deregistered => {
            tracing::info!("'{}' session ended: {:?}", id, end)
        }
        SessionEnd::ProtocolViolation(_) | SessionEnd::Transport(_) => {
            tracing::warn!("'{}' session ended: {:?}", id, end)
        }
    }

    state.disconnect_participant_usecase.execute(id).await;
}

/// Spawns a task that reads this client's frames and sends its chat messages.
///
/// On a protocol violation the pump is told through `close_tx`, since it owns
/// the write half of the socket and sends the close frame.
fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    id: ConnectionId,
    close_tx: oneshot::Sender<ProtocolViolation>,
) -> tokio::task::JoinHandle<SessionEnd> {
    tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return SessionEnd::Transport(e.to_string()),
            };

            let inbound = match frame {
                Message::Text(text) => match parse_inbound(text.as_str()) {
                    Ok(inbound) => inbound,
                    Err(violation) => return reject(close_tx, violation),
                },
                Message::Binary(_) => return reject(close_tx, ProtocolViolation::UnsupportedFrame),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return SessionEnd::ClientClosed,
            };

            match state
                .send_message_usecase
                .execute(SenderName::new(&inbound.sender), &inbound.body)
                .await
            {
                Ok(report) => {
                    tracing::debug!(
                        "'{}' sent message {} ({} delivered)",
                        id,
                        report.message.id,
                        report.delivered.len()
                    );
                }
                Err(SendMessageError::EmptyBody) => {
                    tracing::debug!("Discarding empty message from '{}'", id);
                }
                Err(SendMessageError::ShuttingDown) => {
                    tracing::debug!("Refusing message from '{}' during shutdown", id);
                }
                Err(e) => {
                    tracing::warn!("Dropping message from '{}': {}", id, e);
                }
            }
        }
        SessionEnd::ClientClosed
    })
}

fn reject(close_tx: oneshot::Sender<ProtocolViolation>, violation: ProtocolViolation) -> SessionEnd {
    let _ = close_tx.send(violation.clone());
    SessionEnd::ProtocolViolation(violation)
}

/// Spawns a task that forwards live broadcasts to the socket.
fn pusher_loop(
    mut live: LiveFeed,
    mut sender: SplitSink<WebSocket, Message>,
    mut close_rx: oneshot::Receiver<ProtocolViolation>,
) -> tokio::task::JoinHandle<SessionEnd> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                message = live.recv() => {
                    let Some(message) = message else {
                        let _ = sender
                            .send(close_message(close_code::AWAY, "connection closed by server"))
                            .await;
                        return SessionEnd::Deregistered;
                    };
                    if let Err(e) = send_chat_message(&mut sender, message).await {
                        return SessionEnd::Transport(e.to_string());
                    }
                }
                violation = &mut close_rx => {
                    let Ok(violation) = violation else {
                        return SessionEnd::ClientClosed;
                    };
                    let _ = sender
                        .send(close_message(close_code::UNSUPPORTED, &violation.to_string()))
                        .await;
                    return SessionEnd::ProtocolViolation(violation);
                }
            }
        }
    })
}

async fn send_chat_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: ChatMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&ChatMessageDto::from(message)).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}
