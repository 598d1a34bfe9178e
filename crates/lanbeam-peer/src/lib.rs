//! Peer side of lanbeam: relay signaling, connection negotiation over a
//! pluggable peer transport, and chunked multi-peer file transfer.

pub mod directory;
pub mod error;
pub mod identity;
pub mod node;
pub mod orchestrator;
pub mod signal;
pub mod signaling;
pub mod sim;
#[cfg(test)]
mod testing;
pub mod transfer;
pub mod transport;

pub use directory::{NegotiationState, PeerDirectory, PeerEntry};
pub use error::{ChannelError, FrameError, TransferError, TransportError};
pub use identity::{generate_display_name, NodeIdentity};
pub use node::{Node, NodeEvent};
pub use orchestrator::{ConnectionOrchestrator, OrchestratorEvent, SignalSink};
pub use signal::{IceCandidate, SdpKind, SessionDescription, SignalPayload};
pub use signaling::{SignalingClient, SignalingEvent};
pub use transfer::{
    Direction, FileSource, FrameSink, OutgoingFile, ReceivedFile, TransferEngine, TransferEvent,
    TransferProgress,
};
pub use transport::{
    ChannelState, DataChannel, LinkState, NegotiationSession, PeerTransport, TransportEvent,
};
