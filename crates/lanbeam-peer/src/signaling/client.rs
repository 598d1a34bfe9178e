//! Public handle for the relay connection.

use std::sync::Arc;

use async_trait::async_trait;
use lanbeam_common::ConnectionId;
use lanbeam_config::ClientConfig;
use tokio::sync::{mpsc, RwLock};

use crate::error::TransportError;
use crate::identity::NodeIdentity;
use crate::orchestrator::SignalSink;
use crate::signal::SignalPayload;

use super::connection::connection_loop;
use super::types::{SignalingCommand, SignalingEvent};

/// Handle for the background relay connection.
///
/// Methods only enqueue commands for the connection task.
pub struct SignalingClient {
    command_tx: mpsc::Sender<SignalingCommand>,
    connection_id: Arc<RwLock<Option<ConnectionId>>>,
}

impl SignalingClient {
    /// Start the background connection. Returns `(client, event_receiver)`.
    ///
    /// Events are unbounded so the connection task never waits on a
    /// consumer that is itself waiting to queue commands.
    pub fn connect(
        config: ClientConfig,
        identity: NodeIdentity,
    ) -> (Self, mpsc::UnboundedReceiver<SignalingEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(256);
        let connection_id = Arc::new(RwLock::new(None));

        let client = Self {
            command_tx,
            connection_id: Arc::clone(&connection_id),
        };

        tokio::spawn(connection_loop(
            config,
            identity,
            connection_id,
            event_tx,
            command_rx,
        ));

        (client, event_rx)
    }

    /// A second handle to the same connection.
    pub fn clone_sender(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            connection_id: Arc::clone(&self.connection_id),
        }
    }

    /// Queue `signal{target, signal}`. Signals queued while the relay is
    /// unreachable are dropped.
    pub async fn send_signal(
        &self,
        target: &ConnectionId,
        signal: SignalPayload,
    ) -> Result<(), TransportError> {
        let signal = serde_json::to_value(&signal)
            .map_err(|e| TransportError::Other(format!("encode signal: {e}")))?;
        self.command_tx
            .send(SignalingCommand::Signal {
                target: target.clone(),
                signal,
            })
            .await
            .map_err(|_| TransportError::Other("signaling client stopped".into()))
    }

    /// Our relay address, while joined.
    pub async fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection_id.read().await.is_some()
    }

    /// Close the relay connection and stop reconnecting.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(SignalingCommand::Disconnect).await;
    }
}

#[async_trait]
impl SignalSink for SignalingClient {
    async fn send_signal(
        &self,
        target: &ConnectionId,
        signal: SignalPayload,
    ) -> Result<(), TransportError> {
        SignalingClient::send_signal(self, target, signal).await
    }
}
