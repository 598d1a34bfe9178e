//! Per-peer send worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lanbeam_common::{ConnectionId, FileId};
use lanbeam_config::TransferConfig;
use tokio::sync::mpsc;

use crate::error::{ChannelError, TransferError};

use super::frame::{ControlMessage, Frame};
use super::source::{ChunkReader, OutgoingFile};
use super::types::{Direction, TransferEvent, TransferProgress};

/// Where the engine writes encoded frames. The orchestrator implements
/// this over its per-peer channels.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    async fn send_frame(&self, peer: &ConnectionId, frame: Bytes) -> Result<(), ChannelError>;

    /// Bytes queued on the peer's channel, `None` if it has no channel.
    async fn buffered_amount(&self, peer: &ConnectionId) -> Option<usize>;
}

pub(crate) struct TransferJob {
    pub file_id: FileId,
    pub file: OutgoingFile,
}

pub(crate) struct PeerWorker {
    pub peer: ConnectionId,
    pub sink: Arc<dyn FrameSink>,
    pub config: Arc<TransferConfig>,
    pub events: mpsc::UnboundedSender<TransferEvent>,
    pub cancelled: Arc<AtomicBool>,
}

impl PeerWorker {
    /// Drain the peer's queue in FIFO order until every sender is gone.
    pub(crate) async fn run(self, mut jobs: mpsc::UnboundedReceiver<TransferJob>) {
        let backoff = Duration::from_millis(self.config.queue_backoff_ms);
        let mut first = true;

        while let Some(job) = jobs.recv().await {
            if !first && !self.is_cancelled() {
                tokio::time::sleep(backoff).await;
            }
            first = false;

            let file_id = job.file_id.clone();
            let result = if self.is_cancelled() {
                Err(TransferError::Cancelled)
            } else {
                self.send_file(job).await
            };

            let event = match result {
                Ok(()) => {
                    tracing::info!(peer = %self.peer, file_id = %file_id, "file sent");
                    TransferEvent::SendCompleted {
                        peer: self.peer.clone(),
                        file_id,
                    }
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer, file_id = %file_id, error = %e, "send failed");
                    TransferEvent::SendFailed {
                        peer: self.peer.clone(),
                        file_id,
                        reason: e.to_string(),
                    }
                }
            };
            let _ = self.events.send(event);
        }
        tracing::debug!(peer = %self.peer, "send queue closed");
    }

    async fn send_file(&self, job: TransferJob) -> Result<(), TransferError> {
        let TransferJob { file_id, file } = job;
        let (mut reader, total) = ChunkReader::open(&file.source).await?;

        self.send_frame(Frame::Control(ControlMessage::FileStart {
            file_id: file_id.clone(),
            name: file.name.clone(),
            size: total,
            file_type: file.mime_type.clone(),
        }))
        .await?;
        tracing::info!(
            peer = %self.peer,
            file_id = %file_id,
            name = %file.name,
            size = total,
            "sending file"
        );

        if total == 0 {
            self.progress(&file_id, 0, 0);
        }

        let mut offset = 0u64;
        while let Some(chunk) = reader.next_chunk(self.config.chunk_size).await? {
            self.wait_for_drain().await;
            if self.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            offset += chunk.len() as u64;
            self.send_frame(Frame::Chunk(chunk)).await?;
            self.progress(&file_id, offset, total);
        }

        self.send_frame(Frame::Control(ControlMessage::FileEnd { file_id }))
            .await
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), TransferError> {
        let bytes = frame.encode()?;
        self.sink.send_frame(&self.peer, bytes).await?;
        Ok(())
    }

    /// Hold the next chunk while the channel buffers more than the high
    /// water mark, until it drains to the low water mark.
    async fn wait_for_drain(&self) {
        match self.sink.buffered_amount(&self.peer).await {
            Some(n) if n > self.config.high_water_mark => {
                tracing::debug!(peer = %self.peer, buffered = n, "channel buffer full, pausing");
            }
            _ => return,
        }
        let poll = Duration::from_millis(self.config.backpressure_poll_ms.max(1));
        loop {
            tokio::time::sleep(poll).await;
            if self.is_cancelled() {
                return;
            }
            match self.sink.buffered_amount(&self.peer).await {
                Some(n) if n > self.config.low_water_mark => continue,
                _ => return,
            }
        }
    }

    fn progress(&self, file_id: &FileId, bytes: u64, total: u64) {
        let _ = self.events.send(TransferEvent::Progress(TransferProgress {
            peer: self.peer.clone(),
            file_id: file_id.clone(),
            bytes,
            total,
            direction: Direction::Sending,
        }));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
