use serde::{Deserialize, Serialize};

/// Settings for a peer's connection to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the relay server.
    pub relay_url: String,
    /// Name shown to other peers. Generated by the caller when unset.
    pub display_name: Option<String>,
    /// Stable device identifier. Generated by the caller when unset.
    pub device_id: Option<String>,
    /// Initial reconnect delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Upper bound for the exponential reconnect delay.
    pub max_reconnect_delay_secs: u64,
    /// Timeout for a single connect attempt.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000".into(),
            display_name: None,
            device_id: None,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}
