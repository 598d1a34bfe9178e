//! Receive-side slot for one incoming transfer.

use bytes::{Bytes, BytesMut};
use lanbeam_common::FileId;

use crate::error::FrameError;

use super::types::ReceivedFile;

pub(crate) struct IncomingTransfer {
    pub file_id: FileId,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    chunks: Vec<Bytes>,
    received: u64,
}

impl IncomingTransfer {
    pub(crate) fn new(file_id: FileId, name: String, mime_type: String, size: u64) -> Self {
        Self {
            file_id,
            name,
            mime_type,
            size,
            chunks: Vec::new(),
            received: 0,
        }
    }

    /// Append a chunk; returns the bytes received so far.
    pub(crate) fn push(&mut self, chunk: Bytes) -> Result<u64, FrameError> {
        let received = self.received + chunk.len() as u64;
        if received > self.size {
            return Err(FrameError::Overflow {
                file_id: self.file_id.clone(),
                announced: self.size,
                received,
            });
        }
        self.received = received;
        self.chunks.push(chunk);
        Ok(received)
    }

    /// Concatenate the chunks into the finished file.
    pub(crate) fn finish(self) -> Result<ReceivedFile, FrameError> {
        if self.received != self.size {
            return Err(FrameError::SizeMismatch {
                file_id: self.file_id,
                announced: self.size,
                received: self.received,
            });
        }
        let data = match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.into_iter().next().unwrap_or_default(),
            _ => {
                let mut buf = BytesMut::with_capacity(self.size as usize);
                for chunk in &self.chunks {
                    buf.extend_from_slice(chunk);
                }
                buf.freeze()
            }
        };
        Ok(ReceivedFile {
            file_id: self.file_id,
            name: self.name,
            mime_type: self.mime_type,
            data,
        })
    }
}
