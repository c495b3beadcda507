//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::geometry::ArenaGeometry;
use crate::game::{InputFlags, JoinError, PlayerId};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, KickReason, ServerMsg};

/// Messages the reader hands to the writer task
#[derive(Debug)]
enum Outbound {
    Msg(ServerMsg),
    /// Flush and close the socket
    Close,
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    run_session(connection_id, &state, ws_sink, ws_stream).await;

    // The arena ignores ids it does not know, so this is safe after a kick
    state.arena.leave(connection_id).await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: PlayerId,
    state: &AppState,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    let rate_limiter = PlayerRateLimiter::new();
    let updates = state.arena.subscribe();
    let (out_tx, out_rx) = mpsc::channel(32);
    let (closed_tx, mut closed_rx) = oneshot::channel::<()>();
    let (kick_tx, kick_rx) = mpsc::channel(1);

    let writer_handle = tokio::spawn(async move {
        write_loop(connection_id, ws_sink, out_rx, kick_rx, updates).await;
        let _ = closed_tx.send(());
    });

    let mut joined = false;

    // Reader loop: WebSocket -> arena
    loop {
        let result = tokio::select! {
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = &mut closed_rx => break,
        };

        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                let _ = out_tx
                    .send(Outbound::Msg(ServerMsg::Error {
                        code: "bad_message".to_string(),
                        message: e.to_string(),
                    }))
                    .await;
                continue;
            }
        };

        let replies = match client_msg {
            ClientMsg::Join { nickname } => {
                if joined {
                    warn!(connection_id = %connection_id, "Second join on one connection");
                    closing(ServerMsg::PlayerIdTaken)
                } else {
                    match state.arena.join(connection_id, nickname, kick_tx.clone()).await {
                        Ok(player) => {
                            joined = true;
                            let arena = &state.config.arena;
                            vec![Outbound::Msg(ServerMsg::Joined {
                                player,
                                round_length: arena.round_length,
                                ball_radius: arena.ball_radius,
                                grid_size: ArenaGeometry::new(arena.round_length).grid_size(),
                            })]
                        }
                        Err(JoinError::DuplicateId) => closing(ServerMsg::PlayerIdTaken),
                        Err(e @ JoinError::ArenaClosed) => closing(ServerMsg::Error {
                            code: "arena_closed".to_string(),
                            message: e.to_string(),
                        }),
                    }
                }
            }
            ClientMsg::KeyUpdate { keys } => {
                if !joined {
                    warn!(connection_id = %connection_id, "Key update before join");
                    closing(ServerMsg::NoPlayerObject)
                } else if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited key update");
                    Vec::new()
                } else {
                    let keys = InputFlags::from_json(&keys);
                    if !state.arena.input(connection_id, keys).await {
                        debug!(connection_id = %connection_id, "Arena channel closed");
                        break;
                    }
                    Vec::new()
                }
            }
            ClientMsg::Ping { t } => vec![Outbound::Msg(ServerMsg::Pong { t })],
            ClientMsg::Leave => {
                if joined {
                    state.arena.leave(connection_id).await;
                    joined = false;
                }
                Vec::new()
            }
        };

        let mut closed = false;
        for reply in replies {
            closed |= matches!(reply, Outbound::Close);
            if out_tx.send(reply).await.is_err() {
                closed = true;
                break;
            }
        }
        if closed {
            break;
        }
    }

    drop(out_tx);
    // Let the writer flush a pending close
    let _ = writer_handle.await;
}

fn closing(msg: ServerMsg) -> Vec<Outbound> {
    vec![Outbound::Msg(msg), Outbound::Close]
}

/// Writer task: direct replies, kick notices and broadcast map updates -> WebSocket
async fn write_loop(
    connection_id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<Outbound>,
    mut kick_rx: mpsc::Receiver<KickReason>,
    mut updates: broadcast::Receiver<ServerMsg>,
) {
    loop {
        let msg = tokio::select! {
            biased;
            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Msg(msg)) => msg,
                Some(Outbound::Close) | None => break,
            },
            Some(reason) = kick_rx.recv() => {
                info!(connection_id = %connection_id, reason = ?reason, "Closing connection of kicked player");
                let _ = send_msg(&mut ws_sink, &kick_message(reason)).await;
                break;
            },
            update = updates.recv() => match update {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} updates", n
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Update channel closed");
                    break;
                }
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            return;
        }
    }

    let _ = ws_sink.send(Message::Close(None)).await;
}

/// Message a kicked player receives before the socket closes
fn kick_message(reason: KickReason) -> ServerMsg {
    match reason {
        KickReason::OutOfBounds => ServerMsg::OutOfBounds,
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_kick_maps_to_its_message() {
        let json = serde_json::to_value(kick_message(KickReason::OutOfBounds)).unwrap();
        assert_eq!(json["type"], "out_of_bounds");
    }

    #[test]
    fn closing_sends_message_before_close() {
        let replies = closing(ServerMsg::NoPlayerObject);
        assert!(matches!(replies[0], Outbound::Msg(ServerMsg::NoPlayerObject)));
        assert!(matches!(replies[1], Outbound::Close));
    }
}
