//! Error types for negotiation, channels and transfers.

use lanbeam_common::{ConnectionId, FileId};

/// Failure reported by the peer-transport capability or a negotiation step.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no connection state for peer {0}")]
    UnknownPeer(ConnectionId),

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("negotiation step out of order: {0}")]
    InvalidState(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("transport failure: {0}")]
    Other(String),
}

/// Sending on a peer channel failed.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no open channel to peer {0}")]
    NotOpen(ConnectionId),

    #[error("send to peer {peer} failed: {source}")]
    Send {
        peer: ConnectionId,
        #[source]
        source: TransportError,
    },
}

/// A channel message that does not fit the transfer protocol.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown frame kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("malformed control frame: {0}")]
    Control(#[from] serde_json::Error),

    #[error("chunk received with no open transfer")]
    NoOpenTransfer,

    #[error("transfer {file_id} overflow: announced {announced} bytes, received {received}")]
    Overflow {
        file_id: FileId,
        announced: u64,
        received: u64,
    },

    #[error("transfer {file_id} ended early: announced {announced} bytes, received {received}")]
    SizeMismatch {
        file_id: FileId,
        announced: u64,
        received: u64,
    },
}

/// A send job was aborted.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("file shrank while sending: expected {expected} bytes, read {read}")]
    Truncated { expected: u64, read: u64 },

    #[error("peer disconnected")]
    Cancelled,

    #[error("chunk size {0} outside 1..={max}", max = lanbeam_config::MAX_CHUNK_SIZE)]
    InvalidChunkSize(usize),
}
