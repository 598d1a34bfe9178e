//! Relay signaling client.
//!
//! Keeps one WebSocket connection to the relay alive, joins the room on
//! every (re)connect and turns relay frames into [`SignalingEvent`]s.
//! Outbound `signal` frames are queued through [`SignalingClient`].

mod client;
mod connection;
mod types;

pub use client::SignalingClient;
pub use types::SignalingEvent;
