//! lanbeam-relay: rendezvous server for peer discovery and signaling.
//!
//! Accepts WebSocket connections, keeps one membership table per room,
//! announces joins and leaves, and forwards opaque signaling payloads
//! between participants. No file data ever passes through the relay.

pub mod connection;
pub mod room;
pub mod server;

pub use room::RoomStore;
pub use server::serve;
