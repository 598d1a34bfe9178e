//! Offer/answer/candidate steps.

use std::sync::Arc;

use lanbeam_common::{ConnectionId, PeerInfo};
use tokio::sync::mpsc;

use crate::directory::NegotiationState;
use crate::error::TransportError;
use crate::signal::{IceCandidate, SessionDescription, SignalPayload};
use crate::transport::NegotiationSession;

use super::{pump, Inner, PeerConnection};

impl Inner {
    /// Create negotiation state for `peer` unless it exists. Returns the
    /// session and whether it was created by this call.
    async fn ensure_connection(
        self: &Arc<Self>,
        peer: &ConnectionId,
        initiator: bool,
    ) -> Result<(Arc<dyn NegotiationSession>, bool), TransportError> {
        let mut peers = self.peers.write().await;
        if let Some(conn) = peers.get(peer) {
            return Ok((Arc::clone(&conn.session), false));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = self
            .transport
            .create_session(peer, initiator, events_tx)
            .await?;
        let generation = self.next_generation();
        let pump = tokio::spawn(pump::run(
            Arc::downgrade(self),
            peer.clone(),
            generation,
            events_rx,
        ));
        peers.insert(
            peer.clone(),
            PeerConnection {
                generation,
                state: NegotiationState::Negotiating,
                session: Arc::clone(&session),
                channel: None,
                description_sent: false,
                pending_candidates: Vec::new(),
                pump: Some(pump),
            },
        );
        drop(peers);

        let mut directory = self.directory.write().await;
        if directory.get(peer).is_none() {
            // Offer from a peer the relay has not announced to us.
            directory.upsert(PeerInfo {
                connection_id: peer.clone(),
                device_id: String::new(),
                display_name: String::new(),
            });
        }
        directory.set_state(peer, NegotiationState::Negotiating);
        tracing::debug!(peer = %peer, initiator, generation, "negotiation started");
        Ok((session, true))
    }

    async fn session(&self, peer: &ConnectionId) -> Result<Arc<dyn NegotiationSession>, TransportError> {
        self.peers
            .read()
            .await
            .get(peer)
            .map(|c| Arc::clone(&c.session))
            .ok_or_else(|| TransportError::UnknownPeer(peer.clone()))
    }

    /// Initiator path: offer, store it locally, signal it.
    pub(super) async fn initiate(self: &Arc<Self>, peer: &ConnectionId) -> Result<(), TransportError> {
        let (session, created) = self.ensure_connection(peer, true).await?;
        if !created {
            tracing::debug!(peer = %peer, "already negotiating, not initiating");
            return Ok(());
        }
        let offer = session.create_offer().await?;
        session.set_local_description(offer.clone()).await?;
        self.signals.send_signal(peer, offer.into()).await?;
        self.description_sent(peer).await
    }

    pub(super) async fn apply_signal(
        self: &Arc<Self>,
        sender: &ConnectionId,
        signal: SignalPayload,
    ) -> Result<(), TransportError> {
        match signal {
            SignalPayload::Offer { sdp } => self.answer_offer(sender, sdp).await,
            SignalPayload::Answer { sdp } => {
                let session = self.session(sender).await?;
                tracing::debug!(peer = %sender, "applying answer");
                session
                    .set_remote_description(SessionDescription::answer(sdp))
                    .await
            }
            SignalPayload::Candidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                let session = self.session(sender).await?;
                session
                    .add_candidate(IceCandidate {
                        candidate,
                        sdp_mid,
                        sdp_m_line_index,
                    })
                    .await
            }
        }
    }

    /// Responder path: create state if needed, apply the offer, answer it.
    async fn answer_offer(self: &Arc<Self>, sender: &ConnectionId, sdp: String) -> Result<(), TransportError> {
        let (session, _) = self.ensure_connection(sender, false).await?;
        tracing::debug!(peer = %sender, "answering offer");
        session
            .set_remote_description(SessionDescription::offer(sdp))
            .await?;
        let answer = session.create_answer().await?;
        session.set_local_description(answer.clone()).await?;
        self.signals.send_signal(sender, answer.into()).await?;
        self.description_sent(sender).await
    }

    /// Our description is on its way; release held candidates behind it.
    async fn description_sent(&self, peer: &ConnectionId) -> Result<(), TransportError> {
        let pending = {
            let mut peers = self.peers.write().await;
            let Some(conn) = peers.get_mut(peer) else {
                return Ok(());
            };
            conn.description_sent = true;
            std::mem::take(&mut conn.pending_candidates)
        };
        for candidate in pending {
            self.signals.send_signal(peer, candidate.into()).await?;
        }
        Ok(())
    }

    /// Trickle a local candidate, or hold it until the description is out.
    pub(super) async fn local_candidate(
        &self,
        peer: &ConnectionId,
        generation: u64,
        candidate: IceCandidate,
    ) -> Result<(), TransportError> {
        {
            let mut peers = self.peers.write().await;
            let Some(conn) = peers.get_mut(peer) else {
                return Ok(());
            };
            if conn.generation != generation {
                return Ok(());
            }
            if !conn.description_sent {
                conn.pending_candidates.push(candidate);
                return Ok(());
            }
        }
        self.signals.send_signal(peer, candidate.into()).await
    }
}
