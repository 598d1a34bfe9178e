//! Transfer Engine: per-peer send queues, chunking and reassembly.
//!
//! Every channel message is one [`frame::Frame`]: a control frame
//! (`file-start` / `file-end`) or a raw chunk. Outgoing files to one peer
//! are sent strictly one after another by that peer's worker task; workers
//! for different peers run concurrently. The receive side keeps at most
//! one open transfer per sending peer.

mod engine;
pub mod frame;
mod receiver;
mod sender;
mod source;
mod types;


pub use engine::TransferEngine;
pub use frame::{ControlMessage, Frame};
pub use sender::FrameSink;
pub use source::{FileSource, OutgoingFile, DEFAULT_MIME_TYPE};
pub use types::{Direction, ReceivedFile, TransferEvent, TransferProgress};
