//! Registry of live simulated sessions and the pairing logic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::{DataChannel, LinkState, TransportEvent};

use super::channel::{SimDataChannel, SimLink};
use super::transport::SimTransport;

struct SessionSlot {
    events: mpsc::UnboundedSender<TransportEvent>,
    channel: Option<Arc<SimDataChannel>>,
}

#[derive(Default)]
struct NetworkInner {
    sessions: HashMap<u64, SessionSlot>,
    next_id: u64,
}

/// Shared in-process "network" that simulated transports negotiate over.
#[derive(Clone, Default)]
pub struct SimNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport handle for one node on this network.
    pub fn transport(&self) -> SimTransport {
        SimTransport::new(self.clone())
    }

    /// Number of sessions not yet closed.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Report a failed link to every live session.
    pub fn fail_all(&self) {
        let inner = self.lock();
        for slot in inner.sessions.values() {
            let _ = slot
                .events
                .send(TransportEvent::LinkState(LinkState::Failed));
        }
    }

    pub(crate) fn register(&self, events: mpsc::UnboundedSender<TransportEvent>) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.sessions.insert(
            id,
            SessionSlot {
                events,
                channel: None,
            },
        );
        id
    }

    /// Connect the offerer's and answerer's sessions with a fresh channel.
    pub(crate) fn link(&self, offerer: u64, answerer: u64) -> Result<(), TransportError> {
        let mut inner = self.lock();
        let offer_events = inner
            .sessions
            .get(&offerer)
            .map(|s| s.events.clone())
            .ok_or_else(|| TransportError::Other(format!("sim session {offerer} is gone")))?;
        let answer_events = inner
            .sessions
            .get(&answerer)
            .map(|s| s.events.clone())
            .ok_or_else(|| TransportError::Other(format!("sim session {answerer} is gone")))?;

        let link = SimLink::new();
        let offer_end = Arc::new(SimDataChannel::new(Arc::clone(&link), answer_events.clone()));
        let answer_end = Arc::new(SimDataChannel::new(link, offer_events.clone()));

        if let Some(slot) = inner.sessions.get_mut(&offerer) {
            slot.channel = Some(Arc::clone(&offer_end));
        }
        if let Some(slot) = inner.sessions.get_mut(&answerer) {
            slot.channel = Some(Arc::clone(&answer_end));
        }
        drop(inner);

        // Channel first, then the link state: both trigger "connected".
        let _ = offer_events.send(TransportEvent::ChannelOpen(offer_end));
        let _ = offer_events.send(TransportEvent::LinkState(LinkState::Connected));
        let _ = answer_events.send(TransportEvent::ChannelOpen(answer_end));
        let _ = answer_events.send(TransportEvent::LinkState(LinkState::Connected));

        tracing::debug!(offerer, answerer, "sim sessions linked");
        Ok(())
    }

    /// Drop a session, closing its channel end.
    pub(crate) fn unregister(&self, id: u64) {
        let slot = self.lock().sessions.remove(&id);
        if let Some(channel) = slot.and_then(|s| s.channel) {
            channel.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        // A poisoned registry only means a test panicked mid-update.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
