//! Shared helpers for the integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use lanbeam_config::RelayServerConfig;
use lanbeam_relay::{serve, RoomStore};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Default wait for peer discovery and negotiation on loopback.
pub const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Initialise a tracing subscriber for tests.
///
/// Respects `RUST_LOG`, defaults to `debug`. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Drain `rx` until an event matches `pred`, or give up after `timeout`.
pub async fn wait_for_event<T>(
    rx: &mut mpsc::UnboundedReceiver<T>,
    timeout: Duration,
    mut pred: impl FnMut(&T) -> bool,
) -> Option<T> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) if pred(&event) => return Some(event),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return None,
        }
    }
}

/// Start a relay on an ephemeral port.
pub async fn start_relay() -> (SocketAddr, RoomStore) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = RoomStore::new();
    tokio::spawn(serve(listener, store.clone(), RelayServerConfig::default()));
    (addr, store)
}

/// Forward TCP connections to `target`. Aborting the returned handle
/// drops the listener and every forwarded connection, which looks like a
/// relay outage to anyone connected through it.
pub async fn start_proxy(target: SocketAddr) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut connections = JoinSet::new();
        while let Ok((mut inbound, _)) = listener.accept().await {
            connections.spawn(async move {
                if let Ok(mut outbound) = TcpStream::connect(target).await {
                    let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                }
            });
        }
    });
    (addr, handle)
}
