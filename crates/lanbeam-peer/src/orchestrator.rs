//! Connection Orchestrator: one negotiation state machine per peer.
//!
//! States run `Idle -> Negotiating -> Connected -> Closed`. Negotiation
//! messages travel through a [`SignalSink`] (the relay); connectivity comes
//! from a [`PeerTransport`]. Each peer's transport events are drained by a
//! pump task tagged with a generation number, so events from a torn-down
//! connection never touch its replacement.

mod negotiation;
mod pump;


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lanbeam_common::{ConnectionId, PeerInfo};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::directory::{NegotiationState, PeerDirectory, PeerEntry};
use crate::error::{ChannelError, TransportError};
use crate::signal::{IceCandidate, SignalPayload};
use crate::transfer::FrameSink;
use crate::transport::{ChannelState, DataChannel, NegotiationSession, PeerTransport};

/// Outbound path for negotiation messages.
#[async_trait]
pub trait SignalSink: Send + Sync + 'static {
    async fn send_signal(
        &self,
        target: &ConnectionId,
        signal: SignalPayload,
    ) -> Result<(), TransportError>;
}

/// Notifications from the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Fired once per connection when it reaches `Connected`.
    PeerConnected(ConnectionId),
    /// Fired once per connection when it is torn down.
    PeerDisconnected(ConnectionId),
    /// One message received on a peer's channel.
    DataReceived { peer: ConnectionId, data: Bytes },
}

struct PeerConnection {
    generation: u64,
    state: NegotiationState,
    session: Arc<dyn NegotiationSession>,
    channel: Option<Arc<dyn DataChannel>>,
    /// Local candidates are held until our description has been signalled.
    description_sent: bool,
    pending_candidates: Vec<IceCandidate>,
    pump: Option<JoinHandle<()>>,
}

struct Inner {
    transport: Arc<dyn PeerTransport>,
    signals: Arc<dyn SignalSink>,
    peers: RwLock<HashMap<ConnectionId, PeerConnection>>,
    directory: RwLock<PeerDirectory>,
    event_tx: mpsc::UnboundedSender<OrchestratorEvent>,
    next_generation: AtomicU64,
}

/// Cloneable handle; all clones drive the same connections.
#[derive(Clone)]
pub struct ConnectionOrchestrator {
    inner: Arc<Inner>,
}

impl ConnectionOrchestrator {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        signals: Arc<dyn SignalSink>,
    ) -> (Self, mpsc::UnboundedReceiver<OrchestratorEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            transport,
            signals,
            peers: RwLock::new(HashMap::new()),
            directory: RwLock::new(PeerDirectory::new()),
            event_tx,
            next_generation: AtomicU64::new(1),
        });
        (Self { inner }, event_rx)
    }

    /// Record a peer announced by the relay.
    pub async fn register_peer(&self, info: PeerInfo) {
        self.inner.directory.write().await.upsert(info);
    }

    /// Drop a peer from the directory (after it left the room).
    pub async fn forget_peer(&self, peer: &ConnectionId) {
        self.inner.directory.write().await.remove(peer);
    }

    /// Register every listed peer and start negotiating with it as initiator.
    /// Peers that already have connection state are left alone.
    pub async fn connect_to_peers(&self, peers: &[PeerInfo]) {
        for info in peers {
            self.register_peer(info.clone()).await;
            let peer = &info.connection_id;
            if let Err(e) = self.inner.initiate(peer).await {
                tracing::warn!(peer = %peer, error = %e, "failed to start negotiation");
                self.close_connection(peer).await;
            }
        }
    }

    /// Feed one negotiation message from `sender` into its state machine.
    ///
    /// An offer from an unknown peer creates responder state. An answer or
    /// candidate for an unknown peer is rejected with
    /// [`TransportError::UnknownPeer`]; negotiation with that peer has to
    /// start over. Any other failure closes the peer's connection.
    pub async fn handle_signal(
        &self,
        sender: &ConnectionId,
        signal: SignalPayload,
    ) -> Result<(), TransportError> {
        let result = self.inner.apply_signal(sender, signal).await;
        if let Err(e) = &result {
            tracing::warn!(peer = %sender, error = %e, "dropping negotiation message");
            if !matches!(e, TransportError::UnknownPeer(_)) {
                self.close_connection(sender).await;
            }
        }
        result
    }

    /// Tear down a peer's connection. Returns false if there was none.
    pub async fn close_connection(&self, peer: &ConnectionId) -> bool {
        self.inner.close_connection(peer).await
    }

    pub async fn close_all(&self) {
        let peers: Vec<ConnectionId> = self.inner.peers.read().await.keys().cloned().collect();
        for peer in peers {
            self.close_connection(&peer).await;
        }
    }

    /// Close every connection and empty the directory. Used when the relay
    /// is lost, since every connection id is reissued on rejoin.
    pub async fn forget_all(&self) {
        self.close_all().await;
        self.inner.directory.write().await.clear();
    }

    /// Send one message on the peer's channel. Fails if the channel is
    /// absent or not open.
    pub async fn send_data(
        &self,
        peer: &ConnectionId,
        data: impl Into<Bytes>,
    ) -> Result<(), ChannelError> {
        let channel = self.open_channel(peer).await;
        let Some(channel) = channel else {
            tracing::error!(peer = %peer, "channel not open, message not sent");
            return Err(ChannelError::NotOpen(peer.clone()));
        };
        channel
            .send(data.into())
            .await
            .map_err(|source| ChannelError::Send {
                peer: peer.clone(),
                source,
            })
    }

    /// Bytes queued on the peer's channel, if it has one.
    pub async fn buffered_amount(&self, peer: &ConnectionId) -> Option<usize> {
        self.open_channel(peer).await.map(|c| c.buffered_amount())
    }

    pub async fn state(&self, peer: &ConnectionId) -> Option<NegotiationState> {
        self.inner.peers.read().await.get(peer).map(|c| c.state)
    }

    pub async fn directory_snapshot(&self) -> Vec<PeerEntry> {
        self.inner.directory.read().await.snapshot()
    }

    pub async fn display_name(&self, peer: &ConnectionId) -> String {
        self.inner.directory.read().await.display_name_or_unknown(peer)
    }

    pub async fn connected_peers(&self) -> Vec<ConnectionId> {
        self.inner.directory.read().await.connected_peers()
    }

    async fn open_channel(&self, peer: &ConnectionId) -> Option<Arc<dyn DataChannel>> {
        self.inner
            .peers
            .read()
            .await
            .get(peer)
            .and_then(|c| c.channel.clone())
            .filter(|c| c.ready_state() == ChannelState::Open)
    }
}

#[async_trait]
impl FrameSink for ConnectionOrchestrator {
    async fn send_frame(&self, peer: &ConnectionId, frame: Bytes) -> Result<(), ChannelError> {
        self.send_data(peer, frame).await
    }

    async fn buffered_amount(&self, peer: &ConnectionId) -> Option<usize> {
        ConnectionOrchestrator::buffered_amount(self, peer).await
    }
}

impl Inner {
    fn emit(&self, event: OrchestratorEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("orchestrator event receiver dropped");
        }
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    async fn is_current(&self, peer: &ConnectionId, generation: u64) -> bool {
        self.peers
            .read()
            .await
            .get(peer)
            .is_some_and(|c| c.generation == generation)
    }

    /// Move to `Connected` once per connection. Both the channel-open and
    /// the link-connected trigger land here; the second is a no-op.
    async fn mark_connected(&self, peer: &ConnectionId, generation: u64) {
        {
            let mut peers = self.peers.write().await;
            let Some(conn) = peers.get_mut(peer) else {
                return;
            };
            if conn.generation != generation || conn.state != NegotiationState::Negotiating {
                return;
            }
            conn.state = NegotiationState::Connected;
        }
        self.directory
            .write()
            .await
            .set_state(peer, NegotiationState::Connected);
        tracing::info!(peer = %peer, "peer connected");
        self.emit(OrchestratorEvent::PeerConnected(peer.clone()));
    }

    async fn close_connection(&self, peer: &ConnectionId) -> bool {
        let Some(mut conn) = self.peers.write().await.remove(peer) else {
            return false;
        };
        if let Some(channel) = conn.channel.take() {
            channel.close();
        }
        conn.session.close().await;
        self.directory
            .write()
            .await
            .set_state(peer, NegotiationState::Closed);
        tracing::info!(peer = %peer, "peer connection closed");
        self.emit(OrchestratorEvent::PeerDisconnected(peer.clone()));

        // May be the calling task; nothing below this point.
        if let Some(pump) = conn.pump.take() {
            pump.abort();
        }
        true
    }
}
