use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use lanbeam_common::{ConnectionId, FileId};
use lanbeam_config::{TransferConfig, MAX_CHUNK_SIZE};
use tokio::sync::mpsc;

use crate::error::{FrameError, TransferError};

use super::frame::{ControlMessage, Frame};
use super::receiver::IncomingTransfer;
use super::sender::{FrameSink, PeerWorker, TransferJob};
use super::source::OutgoingFile;
use super::types::{Direction, TransferEvent, TransferProgress};

struct WorkerHandle {
    jobs: mpsc::UnboundedSender<TransferJob>,
    cancelled: Arc<AtomicBool>,
}

struct EngineInner {
    sink: Arc<dyn FrameSink>,
    config: Arc<TransferConfig>,
    workers: Mutex<HashMap<ConnectionId, WorkerHandle>>,
    incoming: Mutex<HashMap<ConnectionId, IncomingTransfer>>,
    event_tx: mpsc::UnboundedSender<TransferEvent>,
}

/// Sends queued files to peers and reassembles files they send.
#[derive(Clone)]
pub struct TransferEngine {
    inner: Arc<EngineInner>,
}

impl TransferEngine {
    /// Fails if `config.chunk_size` is outside `1..=MAX_CHUNK_SIZE`.
    pub fn new(
        sink: Arc<dyn FrameSink>,
        config: TransferConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransferEvent>), TransferError> {
        if config.chunk_size == 0 || config.chunk_size > MAX_CHUNK_SIZE {
            return Err(TransferError::InvalidChunkSize(config.chunk_size));
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(EngineInner {
            sink,
            config: Arc::new(config),
            workers: Mutex::new(HashMap::new()),
            incoming: Mutex::new(HashMap::new()),
            event_tx,
        });
        Ok((Self { inner }, event_rx))
    }

    /// Queue files for `peer` behind anything already queued for it.
    /// Returns the id assigned to each file, in order.
    pub fn send_files(&self, peer: &ConnectionId, files: Vec<OutgoingFile>) -> Vec<FileId> {
        let mut workers = lock(&self.inner.workers);
        let worker = workers
            .entry(peer.clone())
            .or_insert_with(|| self.spawn_worker(peer));

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let file_id = FileId::new();
            tracing::debug!(peer = %peer, file_id = %file_id, name = %file.name, "file queued");
            let job = TransferJob {
                file_id: file_id.clone(),
                file,
            };
            if worker.jobs.send(job).is_err() {
                self.emit(TransferEvent::SendFailed {
                    peer: peer.clone(),
                    file_id: file_id.clone(),
                    reason: "send queue closed".into(),
                });
            }
            ids.push(file_id);
        }
        ids
    }

    fn spawn_worker(&self, peer: &ConnectionId) -> WorkerHandle {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker = PeerWorker {
            peer: peer.clone(),
            sink: Arc::clone(&self.inner.sink),
            config: Arc::clone(&self.inner.config),
            events: self.inner.event_tx.clone(),
            cancelled: Arc::clone(&cancelled),
        };
        tokio::spawn(worker.run(jobs_rx));
        tracing::debug!(peer = %peer, "send worker started");
        WorkerHandle {
            jobs: jobs_tx,
            cancelled,
        }
    }

    /// Process one message received from `peer`'s channel.
    pub fn handle_data(&self, peer: &ConnectionId, data: Bytes) -> Result<(), FrameError> {
        match Frame::decode(data)? {
            Frame::Control(ControlMessage::FileStart {
                file_id,
                name,
                size,
                file_type,
            }) => {
                self.begin_receive(peer, IncomingTransfer::new(file_id, name, file_type, size));
                Ok(())
            }
            Frame::Control(ControlMessage::FileEnd { file_id }) => self.finish_receive(peer, file_id),
            Frame::Chunk(chunk) => self.receive_chunk(peer, chunk),
        }
    }

    fn begin_receive(&self, peer: &ConnectionId, slot: IncomingTransfer) {
        tracing::info!(
            peer = %peer,
            file_id = %slot.file_id,
            name = %slot.name,
            size = slot.size,
            "receiving file"
        );
        let progress = self.progress(peer, &slot.file_id, 0, slot.size);

        let replaced = lock(&self.inner.incoming).insert(peer.clone(), slot);
        if let Some(old) = replaced {
            tracing::warn!(
                peer = %peer,
                file_id = %old.file_id,
                "new transfer started before the previous one ended, dropping it"
            );
            self.emit(TransferEvent::ReceiveAborted {
                peer: peer.clone(),
                file_id: old.file_id,
            });
        }
        self.emit(progress);
    }

    fn receive_chunk(&self, peer: &ConnectionId, chunk: Bytes) -> Result<(), FrameError> {
        let mut incoming = lock(&self.inner.incoming);
        let Some(slot) = incoming.get_mut(peer) else {
            tracing::warn!(peer = %peer, len = chunk.len(), "chunk with no open transfer, dropped");
            return Err(FrameError::NoOpenTransfer);
        };

        match slot.push(chunk) {
            Ok(received) => {
                tracing::trace!(peer = %peer, file_id = %slot.file_id, received, "chunk");
                let progress = self.progress(peer, &slot.file_id, received, slot.size);
                drop(incoming);
                self.emit(progress);
                Ok(())
            }
            Err(e) => {
                if let Some(slot) = incoming.remove(peer) {
                    drop(incoming);
                    tracing::warn!(peer = %peer, error = %e, "incoming transfer discarded");
                    self.emit(TransferEvent::ReceiveAborted {
                        peer: peer.clone(),
                        file_id: slot.file_id,
                    });
                }
                Err(e)
            }
        }
    }

    fn finish_receive(&self, peer: &ConnectionId, file_id: FileId) -> Result<(), FrameError> {
        let slot = {
            let mut incoming = lock(&self.inner.incoming);
            let open = incoming.get(peer).is_some_and(|s| s.file_id == file_id);
            if !open {
                tracing::debug!(peer = %peer, file_id = %file_id, "file-end for a transfer that is not open, ignored");
                return Ok(());
            }
            incoming.remove(peer)
        };
        let Some(slot) = slot else {
            return Ok(());
        };

        match slot.finish() {
            Ok(file) => {
                tracing::info!(
                    peer = %peer,
                    file_id = %file.file_id,
                    name = %file.name,
                    size = file.data.len(),
                    "file received"
                );
                self.emit(TransferEvent::FileReceived {
                    peer: peer.clone(),
                    file,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(peer = %peer, file_id = %file_id, error = %e, "incoming transfer discarded");
                self.emit(TransferEvent::ReceiveAborted {
                    peer: peer.clone(),
                    file_id,
                });
                Err(e)
            }
        }
    }

    /// Release everything held for `peer`: the open incoming transfer is
    /// aborted and queued sends fail.
    pub fn peer_disconnected(&self, peer: &ConnectionId) {
        let slot = lock(&self.inner.incoming).remove(peer);
        if let Some(slot) = slot {
            tracing::info!(peer = %peer, file_id = %slot.file_id, "peer left mid-transfer");
            self.emit(TransferEvent::ReceiveAborted {
                peer: peer.clone(),
                file_id: slot.file_id,
            });
        }

        let worker = lock(&self.inner.workers).remove(peer);
        if let Some(worker) = worker {
            worker.cancelled.store(true, Ordering::Release);
            tracing::debug!(peer = %peer, "send worker stopped");
        }
    }

    /// Whether an incoming transfer from `peer` is open.
    pub fn is_receiving(&self, peer: &ConnectionId) -> bool {
        lock(&self.inner.incoming).contains_key(peer)
    }

    fn progress(&self, peer: &ConnectionId, file_id: &FileId, bytes: u64, total: u64) -> TransferEvent {
        TransferEvent::Progress(TransferProgress {
            peer: peer.clone(),
            file_id: file_id.clone(),
            bytes,
            total,
            direction: Direction::Receiving,
        })
    }

    fn emit(&self, event: TransferEvent) {
        let _ = self.inner.event_tx.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
