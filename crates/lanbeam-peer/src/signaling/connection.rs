//! Background WebSocket connection loop with auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lanbeam_common::{ClientFrame, ConnectionId, ServerFrame};
use lanbeam_config::ClientConfig;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::identity::NodeIdentity;
use crate::signal::SignalPayload;

use super::types::{SignalingCommand, SignalingEvent};

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum SessionResult {
    Shutdown,
    Disconnected(String),
}

pub(crate) async fn connection_loop(
    config: ClientConfig,
    identity: NodeIdentity,
    connection_id: Arc<RwLock<Option<ConnectionId>>>,
    event_tx: mpsc::UnboundedSender<SignalingEvent>,
    mut command_rx: mpsc::Receiver<SignalingCommand>,
) {
    let base_delay = Duration::from_secs(config.reconnect_delay_secs);
    let max_delay = Duration::from_secs(config.max_reconnect_delay_secs);
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut delay = base_delay;

    loop {
        tracing::info!(url = %config.relay_url, "connecting to relay");

        match tokio::time::timeout(
            connect_timeout,
            tokio_tungstenite::connect_async(&config.relay_url),
        )
        .await
        {
            Ok(Ok((ws, _))) => {
                delay = base_delay;
                let result =
                    relay_session(ws, &identity, &connection_id, &event_tx, &mut command_rx)
                        .await;
                *connection_id.write().await = None;

                match result {
                    SessionResult::Shutdown => {
                        tracing::info!("signaling client shutting down");
                        return;
                    }
                    SessionResult::Disconnected(reason) => {
                        tracing::warn!(reason = %reason, "relay connection lost");
                        let _ = event_tx.send(SignalingEvent::Disconnected);
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to connect to relay");
                let _ = event_tx.send(SignalingEvent::Error(format!("connect failed: {e}")));
            }
            Err(_) => {
                tracing::warn!(timeout_secs = config.connect_timeout_secs, "relay connect timed out");
                let _ = event_tx.send(SignalingEvent::Error("connect timed out".into()));
            }
        }

        if !wait_before_reconnect(delay, &mut command_rx).await {
            tracing::info!("signaling client shutting down");
            return;
        }
        delay = (delay * 2).min(max_delay);
    }
}

/// Sleep out the backoff. Signals queued meanwhile are dropped. Returns
/// false if the client asked to stop.
async fn wait_before_reconnect(
    delay: Duration,
    command_rx: &mut mpsc::Receiver<SignalingCommand>,
) -> bool {
    tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = command_rx.recv() => match cmd {
                None | Some(SignalingCommand::Disconnect) => return false,
                Some(SignalingCommand::Signal { target, .. }) => {
                    tracing::warn!(target = %target, "relay unreachable, dropping signal");
                }
            }
        }
    }
}

/// One relay connection: join, then pump commands out and frames in.
async fn relay_session(
    ws: RelaySocket,
    identity: &NodeIdentity,
    connection_id: &RwLock<Option<ConnectionId>>,
    event_tx: &mpsc::UnboundedSender<SignalingEvent>,
    command_rx: &mut mpsc::Receiver<SignalingCommand>,
) -> SessionResult {
    let (mut sink, mut stream) = ws.split();

    let join = ClientFrame::Join {
        device_id: identity.device_id.clone(),
        display_name: identity.display_name.clone(),
    };
    let json = match serde_json::to_string(&join) {
        Ok(json) => json,
        Err(e) => return SessionResult::Disconnected(format!("encode join: {e}")),
    };
    if sink.send(Message::Text(json.into())).await.is_err() {
        return SessionResult::Disconnected("failed to send join".into());
    }

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                None | Some(SignalingCommand::Disconnect) => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionResult::Shutdown;
                }
                Some(SignalingCommand::Signal { target, signal }) => {
                    let frame = ClientFrame::Signal { target, signal };
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode signal");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        return SessionResult::Disconnected("send failed".into());
                    }
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_server_text(&text, connection_id, event_tx).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    return SessionResult::Disconnected("relay closed connection".into());
                }
                Some(Err(e)) => return SessionResult::Disconnected(e.to_string()),
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn handle_server_text(
    text: &str,
    connection_id: &RwLock<Option<ConnectionId>>,
    event_tx: &mpsc::UnboundedSender<SignalingEvent>,
) {
    let frame = match serde_json::from_str::<ServerFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(error = %e, text = %text, "unrecognized relay frame");
            return;
        }
    };

    let event = match frame {
        ServerFrame::Welcome { connection_id: id } => {
            tracing::info!(connection_id = %id, "joined relay room");
            *connection_id.write().await = Some(id.clone());
            SignalingEvent::Connected { connection_id: id }
        }
        ServerFrame::ExistingPeers { peers } => {
            tracing::debug!(count = peers.len(), "existing peers");
            SignalingEvent::ExistingPeers(peers)
        }
        ServerFrame::PeerJoined(info) => {
            tracing::debug!(peer = %info.connection_id, name = %info.display_name, "peer joined");
            SignalingEvent::PeerJoined(info)
        }
        ServerFrame::PeerLeft { connection_id: id } => {
            tracing::debug!(peer = %id, "peer left");
            SignalingEvent::PeerLeft(id)
        }
        ServerFrame::Signal { sender, signal } => {
            match serde_json::from_value::<SignalPayload>(signal) {
                Ok(signal) => SignalingEvent::Signal { sender, signal },
                Err(e) => {
                    tracing::warn!(peer = %sender, error = %e, "invalid signal payload, dropped");
                    return;
                }
            }
        }
        ServerFrame::Error { message } => {
            tracing::warn!(error = %message, "relay error");
            SignalingEvent::Error(message)
        }
    };
    let _ = event_tx.send(event);
}
