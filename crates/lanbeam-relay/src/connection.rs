//! Per-connection handler: wait for `join`, register, then forward frames.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use lanbeam_common::{ClientFrame, ConnectionId, PeerInfo, ServerFrame};
use lanbeam_config::RelayServerConfig;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::room::RoomStore;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Handle a single WebSocket connection for its whole lifetime.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    store: RoomStore,
    config: Arc<RelayServerConfig>,
) {
    let (mut sink, mut stream) = ws.split();
    let join_timeout = Duration::from_secs(config.join_timeout_secs);

    // 1. The first frame must be a join.
    let (device_id, display_name) = match read_join(&mut stream, addr, join_timeout).await {
        Some(v) => v,
        None => return,
    };

    // 2. Assign the connection id and enter the room.
    let connection_id = ConnectionId::new();
    let info = PeerInfo {
        connection_id: connection_id.clone(),
        device_id,
        display_name,
    };
    let (tx, mut rx) = mpsc::channel::<String>(config.outbound_buffer);
    let existing = store.join(info.clone(), &config.room, tx).await;

    tracing::info!(
        peer = %addr,
        connection = %connection_id,
        device = %info.device_id,
        name = %info.display_name,
        room = %config.room,
        existing = existing.len(),
        "Participant joined"
    );

    // 3. Tell the joiner who it is and who is already here.
    let greeting = [
        ServerFrame::Welcome {
            connection_id: connection_id.clone(),
        },
        ServerFrame::ExistingPeers { peers: existing },
    ];
    for frame in &greeting {
        if send_frame(&mut sink, frame).await.is_err() {
            store.leave(&connection_id).await;
            return;
        }
    }

    // 4. Forwarding loop.
    loop {
        tokio::select! {
            // Frames queued for this participant -> its WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this participant's WebSocket
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_text(&store, &connection_id, &text).await {
                            if send_frame(&mut sink, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 5. Cleanup.
    store.leave(&connection_id).await;
    tracing::info!(peer = %addr, connection = %connection_id, "Participant left");
}

/// Route one text frame from a joined participant.
///
/// Returns a frame to send back to the participant, if any.
async fn handle_client_text(
    store: &RoomStore,
    sender: &ConnectionId,
    text: &str,
) -> Option<ServerFrame> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Signal { target, signal }) => {
            tracing::trace!(sender = %sender, target = %target, "Relaying signal");
            store.relay(sender, &target, signal).await;
            None
        }
        Ok(ClientFrame::Join { .. }) => Some(ServerFrame::Error {
            message: "already joined".into(),
        }),
        Err(e) => {
            tracing::debug!(connection = %sender, error = %e, "Malformed client frame");
            Some(ServerFrame::Error {
                message: format!("malformed frame: {e}"),
            })
        }
    }
}

/// Read and parse the first message as a `join` frame.
async fn read_join(
    stream: &mut WsStream,
    addr: SocketAddr,
    timeout: Duration,
) -> Option<(String, String)> {
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<ClientFrame>(&text) {
            Ok(ClientFrame::Join {
                device_id,
                display_name,
            }) => Some((device_id, display_name)),
            Ok(other) => {
                tracing::warn!(peer = %addr, frame = ?other, "Expected join as first frame");
                None
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid join frame");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text join, got another frame kind");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during join");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before join");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, timeout = ?timeout, "Join timeout");
            None
        }
    }
}

/// Send a `ServerFrame` as a JSON text frame.
async fn send_frame(
    sink: &mut WsSink,
    frame: &ServerFrame,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Text(frame.to_json().into())).await
}
