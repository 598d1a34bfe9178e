//! Simulated transport and negotiation session.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lanbeam_common::ConnectionId;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::signal::{IceCandidate, SdpKind, SessionDescription};
use crate::transport::{LinkState, NegotiationSession, PeerTransport, TransportEvent};

use super::network::SimNetwork;

/// [`PeerTransport`] backed by a [`SimNetwork`].
#[derive(Clone)]
pub struct SimTransport {
    network: SimNetwork,
}

impl SimTransport {
    pub(crate) fn new(network: SimNetwork) -> Self {
        Self { network }
    }
}

#[async_trait]
impl PeerTransport for SimTransport {
    async fn create_session(
        &self,
        peer: &ConnectionId,
        initiator: bool,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn NegotiationSession>, TransportError> {
        let id = self.network.register(events.clone());
        tracing::debug!(peer = %peer, session = id, initiator, "sim session created");
        Ok(Arc::new(SimSession {
            id,
            network: self.network.clone(),
            events,
            state: Mutex::new(SessionState::default()),
        }))
    }
}

#[derive(Default)]
struct SessionState {
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    remote_candidates: Vec<IceCandidate>,
    closed: bool,
}

/// One simulated negotiation. Descriptions look like `sim <session> <kind>`.
pub struct SimSession {
    id: u64,
    network: SimNetwork,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Mutex<SessionState>,
}

impl SimSession {
    fn describe(&self, kind: SdpKind) -> SessionDescription {
        let word = match kind {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
        };
        SessionDescription {
            kind,
            sdp: format!("sim {} {}", self.id, word),
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut SessionState) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(TransportError::InvalidState("session closed".into()));
        }
        f(&mut state)
    }
}

fn parse_description(desc: &SessionDescription) -> Result<u64, TransportError> {
    let mut words = desc.sdp.split_whitespace();
    let (Some("sim"), Some(id), Some(kind), None) =
        (words.next(), words.next(), words.next(), words.next())
    else {
        return Err(TransportError::InvalidDescription(desc.sdp.clone()));
    };
    let expected = match desc.kind {
        SdpKind::Offer => "offer",
        SdpKind::Answer => "answer",
    };
    if kind != expected {
        return Err(TransportError::InvalidDescription(format!(
            "{} declared as {expected}",
            desc.sdp
        )));
    }
    id.parse()
        .map_err(|_| TransportError::InvalidDescription(desc.sdp.clone()))
}

#[async_trait]
impl NegotiationSession for SimSession {
    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        self.with_state(|_| Ok(self.describe(SdpKind::Offer)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        self.with_state(|state| match &state.remote {
            Some(remote) if remote.kind == SdpKind::Offer => Ok(self.describe(SdpKind::Answer)),
            _ => Err(TransportError::InvalidState(
                "answer requires a remote offer".into(),
            )),
        })
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), TransportError> {
        self.with_state(|state| {
            state.local = Some(desc);
            Ok(())
        })?;
        let _ = self
            .events
            .send(TransportEvent::LinkState(LinkState::Connecting));
        let _ = self.events.send(TransportEvent::LocalCandidate(IceCandidate {
            candidate: format!("candidate:sim {} 1 udp 1 127.0.0.1 9 typ host", self.id),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        }));
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let remote_id = parse_description(&desc)?;
        let kind = desc.kind;
        self.with_state(|state| {
            if kind == SdpKind::Answer && state.local.is_none() {
                return Err(TransportError::InvalidState(
                    "answer applied before local offer".into(),
                ));
            }
            state.remote = Some(desc);
            Ok(())
        })?;
        if kind == SdpKind::Answer {
            self.network.link(self.id, remote_id)?;
        }
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        self.with_state(|state| {
            if state.remote.is_none() {
                return Err(TransportError::InvalidState(
                    "candidate before remote description".into(),
                ));
            }
            state.remote_candidates.push(candidate);
            tracing::trace!(
                session = self.id,
                count = state.remote_candidates.len(),
                "remote candidate added"
            );
            Ok(())
        })
    }

    async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.network.unregister(self.id);
    }
}
