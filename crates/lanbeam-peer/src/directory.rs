//! Known peers in the room and how far negotiation with each has got.

use std::collections::HashMap;

use lanbeam_common::{ConnectionId, PeerInfo};

/// Shown wherever a peer's display name is unknown.
pub const UNKNOWN_PEER: &str = "Unknown Peer";

/// Negotiation progress for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Negotiating,
    Connected,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub info: PeerInfo,
    pub state: NegotiationState,
}

/// Peer identities announced by the relay, keyed by connection id.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: HashMap<ConnectionId, PeerEntry>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer's identity, keeping its negotiation state.
    pub fn upsert(&mut self, info: PeerInfo) {
        match self.peers.get_mut(&info.connection_id) {
            Some(entry) => entry.info = info,
            None => {
                self.peers.insert(
                    info.connection_id.clone(),
                    PeerEntry {
                        info,
                        state: NegotiationState::Idle,
                    },
                );
            }
        }
    }

    /// Update the state of a known peer. Returns false for unknown peers.
    pub fn set_state(&mut self, id: &ConnectionId, state: NegotiationState) -> bool {
        match self.peers.get_mut(id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &ConnectionId) -> Option<PeerEntry> {
        self.peers.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&PeerEntry> {
        self.peers.get(id)
    }

    pub fn display_name_or_unknown(&self, id: &ConnectionId) -> String {
        self.peers
            .get(id)
            .map(|e| e.info.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_PEER.to_string())
    }

    /// All entries, ordered by connection id.
    pub fn snapshot(&self) -> Vec<PeerEntry> {
        let mut entries: Vec<PeerEntry> = self.peers.values().cloned().collect();
        entries.sort_by(|a, b| a.info.connection_id.cmp(&b.info.connection_id));
        entries
    }

    pub fn connected_peers(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .peers
            .iter()
            .filter(|(_, e)| e.state == NegotiationState::Connected)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
