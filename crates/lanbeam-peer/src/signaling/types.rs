//! Event and command enums for the signaling client.

use lanbeam_common::{ConnectionId, PeerInfo};

use crate::signal::SignalPayload;

/// Events from the signaling connection.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// Joined the room; `connection_id` is our relay address.
    Connected { connection_id: ConnectionId },
    /// Room membership at join time, excluding us.
    ExistingPeers(Vec<PeerInfo>),
    PeerJoined(PeerInfo),
    PeerLeft(ConnectionId),
    Signal {
        sender: ConnectionId,
        signal: SignalPayload,
    },
    /// Connection to the relay lost; a reconnect follows.
    Disconnected,
    Error(String),
}

/// Commands from the client handle to the connection task.
#[derive(Debug)]
pub(crate) enum SignalingCommand {
    Signal {
        target: ConnectionId,
        signal: serde_json::Value,
    },
    Disconnect,
}
