use serde::{Deserialize, Serialize};

/// Largest chunk size accepted by validation.
pub const MAX_CHUNK_SIZE: usize = 262_144;

/// Chunking, queueing and backpressure settings for file transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Maximum bytes per chunk frame.
    pub chunk_size: usize,
    /// Delay between two jobs of the same peer queue, in milliseconds.
    pub queue_backoff_ms: u64,
    /// Pause sending while the channel buffers more than this many bytes.
    pub high_water_mark: usize,
    /// Resume sending once the channel buffer drains to this many bytes.
    pub low_water_mark: usize,
    /// Poll interval while waiting for the channel buffer to drain.
    pub backpressure_poll_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16_384,
            queue_backoff_ms: 100,
            high_water_mark: 1024 * 1024,
            low_water_mark: 256 * 1024,
            backpressure_poll_ms: 5,
        }
    }
}
