//! A complete peer: relay signaling, per-peer negotiation and file
//! transfer wired together behind one event stream.

use std::sync::Arc;

use lanbeam_common::{ConnectionId, FileId, LanbeamError, PeerInfo};
use lanbeam_config::{validation, LanbeamConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::directory::PeerEntry;
use crate::identity::NodeIdentity;
use crate::orchestrator::{ConnectionOrchestrator, OrchestratorEvent};
use crate::signaling::{SignalingClient, SignalingEvent};
use crate::transfer::{OutgoingFile, ReceivedFile, TransferEngine, TransferEvent, TransferProgress};
use crate::transport::PeerTransport;

/// Everything a UI layer needs to know about.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// Joined the relay room.
    Ready { connection_id: ConnectionId },
    /// A peer was announced by the relay.
    PeerDiscovered(PeerInfo),
    PeerConnected {
        peer: ConnectionId,
        display_name: String,
    },
    PeerDisconnected { peer: ConnectionId },
    /// The peer left the relay room.
    PeerLeft { peer: ConnectionId },
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
    ReceiveAborted {
        peer: ConnectionId,
        file_id: FileId,
    },
    /// Lost the relay; all peer connections were closed.
    RelayDisconnected,
}

impl From<TransferEvent> for NodeEvent {
    fn from(event: TransferEvent) -> Self {
        match event {
            TransferEvent::Progress(p) => NodeEvent::Progress(p),
            TransferEvent::FileReceived { peer, file } => NodeEvent::FileReceived { peer, file },
            TransferEvent::SendCompleted { peer, file_id } => {
                NodeEvent::SendCompleted { peer, file_id }
            }
            TransferEvent::SendFailed {
                peer,
                file_id,
                reason,
            } => NodeEvent::SendFailed {
                peer,
                file_id,
                reason,
            },
            TransferEvent::ReceiveAborted { peer, file_id } => {
                NodeEvent::ReceiveAborted { peer, file_id }
            }
        }
    }
}

pub struct Node {
    identity: NodeIdentity,
    signaling: SignalingClient,
    orchestrator: ConnectionOrchestrator,
    engine: TransferEngine,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Connect to the relay and start routing. Must be called inside a
    /// tokio runtime. An invalid config is rejected before anything starts.
    pub fn start(
        config: &LanbeamConfig,
        identity: NodeIdentity,
        transport: Arc<dyn PeerTransport>,
    ) -> lanbeam_common::Result<(Self, mpsc::UnboundedReceiver<NodeEvent>)> {
        validation::validate(config)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let (signaling, signaling_rx) =
            SignalingClient::connect(config.client.clone(), identity.clone());
        let (orchestrator, orchestrator_rx) =
            ConnectionOrchestrator::new(transport, Arc::new(signaling.clone_sender()));
        let (engine, transfer_rx) =
            TransferEngine::new(Arc::new(orchestrator.clone()), config.transfer.clone())
                .map_err(|e| LanbeamError::Transfer(e.to_string()))?;

        tracing::info!(
            device_id = %identity.device_id,
            name = %identity.display_name,
            relay = %config.client.relay_url,
            "node starting"
        );

        let tasks = vec![
            tokio::spawn(route_signaling(
                signaling_rx,
                orchestrator.clone(),
                event_tx.clone(),
            )),
            tokio::spawn(route_connections(
                orchestrator_rx,
                orchestrator.clone(),
                engine.clone(),
                event_tx.clone(),
            )),
            tokio::spawn(route_transfers(transfer_rx, event_tx)),
        ];

        let node = Self {
            identity,
            signaling,
            orchestrator,
            engine,
            tasks,
        };
        Ok((node, event_rx))
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Our relay address, once joined.
    pub async fn connection_id(&self) -> Option<ConnectionId> {
        self.signaling.connection_id().await
    }

    /// Queue files for one peer. Returns the assigned file ids in order.
    pub fn send_files(&self, peer: &ConnectionId, files: Vec<OutgoingFile>) -> Vec<FileId> {
        self.engine.send_files(peer, files)
    }

    /// Queue the same files for every connected peer.
    pub async fn send_files_to_all(
        &self,
        files: Vec<OutgoingFile>,
    ) -> Vec<(ConnectionId, Vec<FileId>)> {
        let peers = self.orchestrator.connected_peers().await;
        if peers.is_empty() {
            tracing::warn!("no connected peers, nothing sent");
        }
        peers
            .into_iter()
            .map(|peer| {
                let ids = self.engine.send_files(&peer, files.clone());
                (peer, ids)
            })
            .collect()
    }

    /// Known peers and their negotiation state.
    pub async fn peers(&self) -> Vec<PeerEntry> {
        self.orchestrator.directory_snapshot().await
    }

    /// Leave the relay and close every peer connection. Events raised
    /// after this point are not delivered.
    pub async fn shutdown(mut self) {
        tracing::info!("node shutting down");
        self.signaling.disconnect().await;
        self.orchestrator.close_all().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn route_signaling(
    mut rx: mpsc::UnboundedReceiver<SignalingEvent>,
    orchestrator: ConnectionOrchestrator,
    events: mpsc::UnboundedSender<NodeEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            SignalingEvent::Connected { connection_id } => {
                let _ = events.send(NodeEvent::Ready { connection_id });
            }
            SignalingEvent::ExistingPeers(peers) => {
                for info in &peers {
                    let _ = events.send(NodeEvent::PeerDiscovered(info.clone()));
                }
                orchestrator.connect_to_peers(&peers).await;
            }
            SignalingEvent::PeerJoined(info) => {
                orchestrator.register_peer(info.clone()).await;
                let _ = events.send(NodeEvent::PeerDiscovered(info));
            }
            SignalingEvent::PeerLeft(peer) => {
                orchestrator.close_connection(&peer).await;
                orchestrator.forget_peer(&peer).await;
                let _ = events.send(NodeEvent::PeerLeft { peer });
            }
            SignalingEvent::Signal { sender, signal } => {
                // Failures are logged by the orchestrator.
                let _ = orchestrator.handle_signal(&sender, signal).await;
            }
            SignalingEvent::Disconnected => {
                // Ids are reissued on rejoin and existing-peers repopulates.
                orchestrator.forget_all().await;
                let _ = events.send(NodeEvent::RelayDisconnected);
            }
            SignalingEvent::Error(message) => {
                tracing::debug!(error = %message, "signaling error");
            }
        }
    }
}

async fn route_connections(
    mut rx: mpsc::UnboundedReceiver<OrchestratorEvent>,
    orchestrator: ConnectionOrchestrator,
    engine: TransferEngine,
    events: mpsc::UnboundedSender<NodeEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            OrchestratorEvent::PeerConnected(peer) => {
                let display_name = orchestrator.display_name(&peer).await;
                let _ = events.send(NodeEvent::PeerConnected { peer, display_name });
            }
            OrchestratorEvent::PeerDisconnected(peer) => {
                engine.peer_disconnected(&peer);
                let _ = events.send(NodeEvent::PeerDisconnected { peer });
            }
            OrchestratorEvent::DataReceived { peer, data } => {
                if let Err(e) = engine.handle_data(&peer, data) {
                    tracing::warn!(peer = %peer, error = %e, "bad frame from peer");
                }
            }
        }
    }
}

async fn route_transfers(
    mut rx: mpsc::UnboundedReceiver<TransferEvent>,
    events: mpsc::UnboundedSender<NodeEvent>,
) {
    while let Some(event) = rx.recv().await {
        let _ = events.send(event.into());
    }
}
