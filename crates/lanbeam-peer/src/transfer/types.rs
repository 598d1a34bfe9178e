use bytes::Bytes;
use lanbeam_common::{ConnectionId, FileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sending,
    Receiving,
}

/// Bytes moved so far for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub peer: ConnectionId,
    pub file_id: FileId,
    pub bytes: u64,
    pub total: u64,
    pub direction: Direction,
}

impl TransferProgress {
    /// `floor(100 * bytes / total)`; an empty file is complete from the start.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = u128::from(self.bytes) * 100 / u128::from(self.total);
        pct.min(100) as u8
    }

    pub fn is_sending(&self) -> bool {
        self.direction == Direction::Sending
    }
}

/// A completely reassembled incoming file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub file_id: FileId,
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Progress(TransferProgress),
    FileReceived {
        peer: ConnectionId,
        file: ReceivedFile,
    },
    SendCompleted {
        peer: ConnectionId,
        file_id: FileId,
    },
    SendFailed {
        peer: ConnectionId,
        file_id: FileId,
        reason: String,
    },
    /// An incoming transfer was dropped before its `file-end`.
    ReceiveAborted {
        peer: ConnectionId,
        file_id: FileId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(bytes: u64, total: u64) -> TransferProgress {
        TransferProgress {
            peer: "p".into(),
            file_id: "f".into(),
            bytes,
            total,
            direction: Direction::Receiving,
        }
    }

    #[test]
    fn percent_floors() {
        assert_eq!(progress(1, 3).percent(), 33);
        assert_eq!(progress(16_384, 40_000).percent(), 40);
        assert_eq!(progress(40_000, 40_000).percent(), 100);
    }

    #[test]
    fn empty_file_is_complete() {
        assert_eq!(progress(0, 0).percent(), 100);
    }

    #[test]
    fn huge_sizes_do_not_overflow() {
        assert_eq!(progress(u64::MAX / 2, u64::MAX).percent(), 49);
    }
}
