//! Peer-transport capability.
//!
//! The actual connectivity machinery (NAT traversal, encryption, the data
//! channel itself) lives behind these traits. The orchestrator only drives
//! the offer/answer/candidate steps and consumes [`TransportEvent`]s.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lanbeam_common::ConnectionId;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::signal::{IceCandidate, SessionDescription};

/// Label of the data channel the initiator opens.
pub const CHANNEL_LABEL: &str = "file-transfer";

/// Connection-level state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl LinkState {
    /// Whether this state ends the connection.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LinkState::Disconnected | LinkState::Failed | LinkState::Closed
        )
    }
}

/// Ready state of a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Asynchronous notifications from one negotiation session.
pub enum TransportEvent {
    /// A local connectivity candidate to trickle to the remote peer.
    LocalCandidate(IceCandidate),
    /// Connection state change.
    LinkState(LinkState),
    /// The data channel is usable.
    ChannelOpen(Arc<dyn DataChannel>),
    /// One message received on the data channel.
    ChannelMessage(Bytes),
    /// The data channel closed.
    ChannelClosed,
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            TransportEvent::LinkState(s) => f.debug_tuple("LinkState").field(s).finish(),
            TransportEvent::ChannelOpen(ch) => f.debug_tuple("ChannelOpen").field(ch).finish(),
            TransportEvent::ChannelMessage(b) => {
                f.debug_tuple("ChannelMessage").field(&b.len()).finish()
            }
            TransportEvent::ChannelClosed => f.write_str("ChannelClosed"),
        }
    }
}

/// Factory for per-peer negotiation sessions.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    /// Create the negotiation handle for `peer`.
    ///
    /// The initiator opens the data channel labelled [`CHANNEL_LABEL`];
    /// the responder learns about it through [`TransportEvent::ChannelOpen`].
    /// All asynchronous notifications for the session go to `events`.
    async fn create_session(
        &self,
        peer: &ConnectionId,
        initiator: bool,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn NegotiationSession>, TransportError>;
}

/// Offer/answer/candidate primitives for one peer.
#[async_trait]
pub trait NegotiationSession: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError>;

    async fn set_remote_description(&self, desc: SessionDescription)
        -> Result<(), TransportError>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError>;

    /// Release the session and its channel. Idempotent.
    async fn close(&self);
}

/// Ordered, reliable, message-framed channel to one peer.
#[async_trait]
pub trait DataChannel: Send + Sync + fmt::Debug {
    fn label(&self) -> &str;

    fn ready_state(&self) -> ChannelState;

    /// Bytes queued locally and not yet handed to the network.
    fn buffered_amount(&self) -> usize;

    async fn send(&self, data: Bytes) -> Result<(), TransportError>;

    fn close(&self);
}
