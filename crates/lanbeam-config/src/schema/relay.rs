use serde::{Deserialize, Serialize};

/// Settings for the relay (rendezvous) server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayServerConfig {
    /// Address to bind the listener on.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Name of the room every participant joins.
    pub room: String,
    /// Seconds a new connection has to send its `join` frame.
    pub join_timeout_secs: u64,
    /// Capacity of each connection's outbound frame queue.
    pub outbound_buffer: usize,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            room: "global-room".into(),
            join_timeout_secs: 10,
            outbound_buffer: 256,
        }
    }
}

impl RelayServerConfig {
    /// `bind:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
