//! Room membership table and notification fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use lanbeam_common::{ConnectionId, PeerInfo, ServerFrame};
use tokio::sync::{mpsc, RwLock};

/// One connected participant.
pub struct Participant {
    pub info: PeerInfo,
    pub room: String,
    pub tx: mpsc::Sender<String>,
}

/// Thread-safe participant table keyed by connection id.
#[derive(Clone, Default)]
pub struct RoomStore {
    participants: Arc<RwLock<HashMap<ConnectionId, Participant>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant to `room`.
    ///
    /// Returns the room's membership before the join (the joiner's
    /// `existing-peers`) and announces `peer-joined` to those members.
    pub async fn join(
        &self,
        info: PeerInfo,
        room: &str,
        tx: mpsc::Sender<String>,
    ) -> Vec<PeerInfo> {
        let joined = ServerFrame::PeerJoined(info.clone()).to_json();

        let (mut existing, others) = {
            let mut map = self.participants.write().await;
            let mut existing = Vec::new();
            let mut others = Vec::new();
            for p in map.values().filter(|p| p.room == room) {
                existing.push(p.info.clone());
                others.push(p.tx.clone());
            }
            map.insert(
                info.connection_id.clone(),
                Participant {
                    info,
                    room: room.to_string(),
                    tx,
                },
            );
            (existing, others)
        };

        for tx in others {
            deliver(&tx, joined.clone());
        }

        existing.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        existing
    }

    /// Forward `signal` from `sender` to `target`.
    ///
    /// Best effort: returns false and does nothing else when the target is
    /// not connected.
    pub async fn relay(
        &self,
        sender: &ConnectionId,
        target: &ConnectionId,
        signal: serde_json::Value,
    ) -> bool {
        let tx = {
            let map = self.participants.read().await;
            match map.get(target) {
                Some(p) => p.tx.clone(),
                None => {
                    tracing::debug!(sender = %sender, target = %target, "Signal target not connected");
                    return false;
                }
            }
        };
        let frame = ServerFrame::Signal {
            sender: sender.clone(),
            signal,
        };
        deliver(&tx, frame.to_json())
    }

    /// Remove a participant and announce `peer-left` to its room.
    ///
    /// Returns false if the participant was already gone.
    pub async fn leave(&self, connection_id: &ConnectionId) -> bool {
        let (room, others) = {
            let mut map = self.participants.write().await;
            let Some(removed) = map.remove(connection_id) else {
                return false;
            };
            let others: Vec<_> = map
                .values()
                .filter(|p| p.room == removed.room)
                .map(|p| p.tx.clone())
                .collect();
            (removed.room, others)
        };

        let left = ServerFrame::PeerLeft {
            connection_id: connection_id.clone(),
        }
        .to_json();
        for tx in others {
            deliver(&tx, left.clone());
        }
        tracing::debug!(connection = %connection_id, room = %room, "Participant removed");
        true
    }

    /// Check whether a connection has joined.
    pub async fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.participants.read().await.contains_key(connection_id)
    }

    /// Number of joined participants across all rooms.
    pub async fn count(&self) -> usize {
        self.participants.read().await.len()
    }
}

/// Queue a frame without waiting; a full or closed queue drops it.
fn deliver(tx: &mpsc::Sender<String>, frame: String) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("Outbound queue full, dropping frame");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
