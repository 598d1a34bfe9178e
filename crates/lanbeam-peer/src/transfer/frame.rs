//! Channel frame format.
//!
//! ```text
//! 0x01 | JSON control message      {"type":"file-start",...} / {"type":"file-end",...}
//! 0x02 | raw file bytes
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use lanbeam_common::FileId;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

pub const KIND_CONTROL: u8 = 0x01;
pub const KIND_CHUNK: u8 = 0x02;

/// Transfer control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Announces a transfer; chunks follow until the matching `file-end`.
    #[serde(rename_all = "camelCase")]
    FileStart {
        file_id: FileId,
        name: String,
        size: u64,
        file_type: String,
    },
    #[serde(rename_all = "camelCase")]
    FileEnd { file_id: FileId },
}

/// One channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(ControlMessage),
    Chunk(Bytes),
}

impl Frame {
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        match self {
            Frame::Control(msg) => {
                let mut buf = Vec::with_capacity(128);
                buf.push(KIND_CONTROL);
                serde_json::to_writer(&mut buf, msg)?;
                Ok(Bytes::from(buf))
            }
            Frame::Chunk(data) => {
                let mut buf = BytesMut::with_capacity(1 + data.len());
                buf.put_u8(KIND_CHUNK);
                buf.extend_from_slice(data);
                Ok(buf.freeze())
            }
        }
    }

    /// Parse a channel message. Chunk payloads share `data`'s buffer.
    pub fn decode(data: Bytes) -> Result<Self, FrameError> {
        let Some(&kind) = data.first() else {
            return Err(FrameError::Empty);
        };
        match kind {
            KIND_CONTROL => Ok(Frame::Control(serde_json::from_slice(&data[1..])?)),
            KIND_CHUNK => Ok(Frame::Chunk(data.slice(1..))),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}
