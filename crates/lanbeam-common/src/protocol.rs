//! Relay wire protocol shared by the relay server and its clients.
//!
//! Every frame is a JSON text message tagged by `type`. The `signal` payload
//! is opaque to the relay and forwarded verbatim.

use serde::{Deserialize, Serialize};

use crate::id::ConnectionId;

/// Public view of one room participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub connection_id: ConnectionId,
    pub device_id: String,
    pub display_name: String,
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Enter the room. Must be the first frame of a connection.
    #[serde(rename_all = "camelCase")]
    Join {
        device_id: String,
        display_name: String,
    },
    /// Forward `signal` to `target`.
    Signal {
        target: ConnectionId,
        signal: serde_json::Value,
    },
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// Sent once after `join`, carrying the joiner's own address.
    #[serde(rename_all = "camelCase")]
    Welcome { connection_id: ConnectionId },
    /// Room membership at join time, excluding the joiner.
    ExistingPeers { peers: Vec<PeerInfo> },
    PeerJoined(PeerInfo),
    #[serde(rename_all = "camelCase")]
    PeerLeft { connection_id: ConnectionId },
    Signal {
        sender: ConnectionId,
        signal: serde_json::Value,
    },
    Error { message: String },
}

impl ServerFrame {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> String {
        // Only strings, ids and already-parsed JSON values: cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"type\":\"error\",\"message\":\"encode failed: {e}\"}}")
        })
    }
}
