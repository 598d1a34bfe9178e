//! Simulated data channel: one end of an in-process message pipe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::{ChannelState, DataChannel, TransportEvent, CHANNEL_LABEL};

/// State shared by both ends of a simulated channel.
#[derive(Debug)]
pub(crate) struct SimLink {
    open: AtomicBool,
}

impl SimLink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(true),
        })
    }
}

/// One end of a simulated channel. Sending delivers a
/// [`TransportEvent::ChannelMessage`] to the other end's session.
pub struct SimDataChannel {
    link: Arc<SimLink>,
    remote: mpsc::UnboundedSender<TransportEvent>,
}

impl SimDataChannel {
    pub(crate) fn new(link: Arc<SimLink>, remote: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { link, remote }
    }
}

impl std::fmt::Debug for SimDataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDataChannel")
            .field("state", &self.ready_state())
            .finish()
    }
}

#[async_trait]
impl DataChannel for SimDataChannel {
    fn label(&self) -> &str {
        CHANNEL_LABEL
    }

    fn ready_state(&self) -> ChannelState {
        if self.link.open.load(Ordering::Acquire) {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    fn buffered_amount(&self) -> usize {
        0
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        if !self.link.open.load(Ordering::Acquire) {
            return Err(TransportError::ChannelClosed);
        }
        self.remote
            .send(TransportEvent::ChannelMessage(data))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&self) {
        // Only the first close of either end notifies the other end.
        if self.link.open.swap(false, Ordering::AcqRel) {
            let _ = self.remote.send(TransportEvent::ChannelClosed);
        }
    }
}
