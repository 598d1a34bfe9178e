//! Per-connection task draining transport events.

use std::sync::{Arc, Weak};

use lanbeam_common::ConnectionId;
use tokio::sync::mpsc;

use crate::transport::{DataChannel, TransportEvent};

use super::{Inner, OrchestratorEvent};

pub(super) async fn run(
    inner: Weak<Inner>,
    peer: ConnectionId,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.is_current(&peer, generation).await {
            if let TransportEvent::ChannelOpen(channel) = event {
                channel.close();
            }
            break;
        }
        tracing::trace!(peer = %peer, ?event, "transport event");

        match event {
            TransportEvent::LocalCandidate(candidate) => {
                if let Err(e) = inner.local_candidate(&peer, generation, candidate).await {
                    tracing::warn!(peer = %peer, error = %e, "failed to signal candidate");
                }
            }
            TransportEvent::LinkState(state) if state.is_terminal() => {
                tracing::info!(peer = %peer, ?state, "link lost");
                inner.close_connection(&peer).await;
                break;
            }
            TransportEvent::LinkState(state) => {
                if state == crate::transport::LinkState::Connected {
                    inner.mark_connected(&peer, generation).await;
                }
            }
            TransportEvent::ChannelOpen(channel) => {
                attach_channel(&inner, &peer, generation, channel).await;
                inner.mark_connected(&peer, generation).await;
            }
            TransportEvent::ChannelMessage(data) => {
                inner.emit(OrchestratorEvent::DataReceived {
                    peer: peer.clone(),
                    data,
                });
            }
            TransportEvent::ChannelClosed => {
                tracing::info!(peer = %peer, "channel closed by transport");
                inner.close_connection(&peer).await;
                break;
            }
        }
    }
}

async fn attach_channel(
    inner: &Inner,
    peer: &ConnectionId,
    generation: u64,
    channel: Arc<dyn DataChannel>,
) {
    let mut peers = inner.peers.write().await;
    match peers.get_mut(peer) {
        Some(conn) if conn.generation == generation => {
            tracing::debug!(peer = %peer, label = channel.label(), "channel open");
            conn.channel = Some(channel);
        }
        _ => channel.close(),
    }
}
