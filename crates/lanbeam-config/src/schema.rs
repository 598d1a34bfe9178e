//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod client;
mod relay;
mod transfer;

pub use client::*;
pub use relay::*;
pub use transfer::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanbeamConfig {
    pub relay: RelayServerConfig,
    pub client: ClientConfig,
    pub transfer: TransferConfig,
}
