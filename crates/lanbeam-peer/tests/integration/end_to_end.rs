//! Two nodes find each other through a real relay, negotiate over the
//! simulated transport and exchange files.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lanbeam_common::{ConnectionId, LanbeamError};
use lanbeam_config::LanbeamConfig;
use lanbeam_peer::sim::SimNetwork;
use lanbeam_peer::{NegotiationState, Node, NodeEvent, NodeIdentity, OutgoingFile};
use tokio::sync::mpsc;

use crate::helpers::{
    init_test_tracing, start_proxy, start_relay, wait_for_event, CONNECTION_TIMEOUT_SECS,
};

const WAIT: Duration = Duration::from_secs(CONNECTION_TIMEOUT_SECS);

fn config(addr: SocketAddr) -> LanbeamConfig {
    let mut config = LanbeamConfig::default();
    config.client.relay_url = format!("ws://{addr}");
    config.transfer.queue_backoff_ms = 1;
    config
}

async fn ready(rx: &mut mpsc::UnboundedReceiver<NodeEvent>) -> ConnectionId {
    match wait_for_event(rx, WAIT, |e| matches!(e, NodeEvent::Ready { .. })).await {
        Some(NodeEvent::Ready { connection_id }) => connection_id,
        other => panic!("node never joined: {other:?}"),
    }
}

async fn connected(rx: &mut mpsc::UnboundedReceiver<NodeEvent>) -> (ConnectionId, String) {
    match wait_for_event(rx, WAIT, |e| matches!(e, NodeEvent::PeerConnected { .. })).await {
        Some(NodeEvent::PeerConnected { peer, display_name }) => (peer, display_name),
        other => panic!("peer never connected: {other:?}"),
    }
}

struct Pair {
    alice: Node,
    bob: Node,
    alice_rx: mpsc::UnboundedReceiver<NodeEvent>,
    bob_rx: mpsc::UnboundedReceiver<NodeEvent>,
    alice_id: ConnectionId,
    bob_id: ConnectionId,
}

async fn connected_pair() -> Pair {
    init_test_tracing();
    let (addr, _) = start_relay().await;
    connected_pair_via(addr, addr).await
}

/// Alice reaches the relay at `alice_relay`, Bob at `bob_relay`.
async fn connected_pair_via(alice_relay: SocketAddr, bob_relay: SocketAddr) -> Pair {
    let net = SimNetwork::new();

    let (alice, mut alice_rx) = Node::start(
        &config(alice_relay),
        NodeIdentity::new("dev-alice", "Alice"),
        Arc::new(net.transport()),
    )
    .unwrap();
    let alice_id = ready(&mut alice_rx).await;

    // Bob joins second and initiates to Alice.
    let (bob, mut bob_rx) = Node::start(
        &config(bob_relay),
        NodeIdentity::new("dev-bob", "Bob"),
        Arc::new(net.transport()),
    )
    .unwrap();
    let bob_id = ready(&mut bob_rx).await;

    let (peer, name) = connected(&mut bob_rx).await;
    assert_eq!(peer, alice_id);
    assert_eq!(name, "Alice");
    let (peer, name) = connected(&mut alice_rx).await;
    assert_eq!(peer, bob_id);
    assert_eq!(name, "Bob");

    Pair {
        alice,
        bob,
        alice_rx,
        bob_rx,
        alice_id,
        bob_id,
    }
}

#[tokio::test]
async fn nodes_connect_once_each() {
    let mut p = connected_pair().await;

    // The dual trigger must not produce a second notification.
    let again = wait_for_event(&mut p.alice_rx, Duration::from_millis(300), |e| {
        matches!(e, NodeEvent::PeerConnected { .. })
    })
    .await;
    assert!(again.is_none());
    let again = wait_for_event(&mut p.bob_rx, Duration::from_millis(300), |e| {
        matches!(e, NodeEvent::PeerConnected { .. })
    })
    .await;
    assert!(again.is_none());

    let peers = p.alice.peers().await;
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].info.connection_id, p.bob_id);
    assert_eq!(peers[0].state, NegotiationState::Connected);
    assert_eq!(p.bob.connection_id().await, Some(p.bob_id.clone()));
}

#[tokio::test]
async fn file_crosses_between_nodes() {
    let mut p = connected_pair().await;
    let data: Vec<u8> = (0..40_000).map(|i| (i % 251) as u8).collect();

    let ids = p.bob.send_files(
        &p.alice_id,
        vec![OutgoingFile::from_bytes("photo.jpg", data.clone()).with_mime_type("image/jpeg")],
    );

    match wait_for_event(&mut p.alice_rx, WAIT, |e| matches!(e, NodeEvent::FileReceived { .. })).await {
        Some(NodeEvent::FileReceived { peer, file }) => {
            assert_eq!(peer, p.bob_id);
            assert_eq!(file.file_id, ids[0]);
            assert_eq!(file.name, "photo.jpg");
            assert_eq!(file.mime_type, "image/jpeg");
            assert_eq!(&file.data[..], &data[..]);
        }
        other => panic!("file never arrived: {other:?}"),
    }
    match wait_for_event(&mut p.bob_rx, WAIT, |e| matches!(e, NodeEvent::SendCompleted { .. })).await {
        Some(NodeEvent::SendCompleted { peer, file_id }) => {
            assert_eq!(peer, p.alice_id);
            assert_eq!(file_id, ids[0]);
        }
        other => panic!("send never completed: {other:?}"),
    }
}

#[tokio::test]
async fn send_to_all_reaches_connected_peer() {
    let mut p = connected_pair().await;
    let sent = p
        .alice
        .send_files_to_all(vec![OutgoingFile::from_bytes("notes.txt", b"hello bob".to_vec())])
        .await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, p.bob_id);

    match wait_for_event(&mut p.bob_rx, WAIT, |e| matches!(e, NodeEvent::FileReceived { .. })).await {
        Some(NodeEvent::FileReceived { file, .. }) => assert_eq!(&file.data[..], b"hello bob"),
        other => panic!("file never arrived: {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_disconnects_the_other_side() {
    let mut p = connected_pair().await;
    let bob_id = p.bob_id.clone();
    p.bob.shutdown().await;

    // The channel closing and the relay's peer-left race each other.
    let (mut disconnected, mut left) = (false, false);
    while !(disconnected && left) {
        let event = wait_for_event(&mut p.alice_rx, WAIT, |e| {
            matches!(
                e,
                NodeEvent::PeerDisconnected { .. } | NodeEvent::PeerLeft { .. }
            )
        })
        .await;
        match event {
            Some(NodeEvent::PeerDisconnected { peer }) => {
                assert_eq!(peer, bob_id);
                assert!(!disconnected, "disconnect reported twice");
                disconnected = true;
            }
            Some(NodeEvent::PeerLeft { peer }) => {
                assert_eq!(peer, bob_id);
                left = true;
            }
            other => panic!("missing disconnect/peer-left: {other:?}"),
        }
    }
    assert!(p.alice.peers().await.is_empty());
}

#[tokio::test]
async fn relay_loss_closes_and_forgets_peers() {
    init_test_tracing();
    let (relay, _) = start_relay().await;
    let (proxy, outage) = start_proxy(relay).await;
    let mut p = connected_pair_via(proxy, relay).await;

    // Alice's only route to the relay goes away.
    outage.abort();

    let (mut disconnected, mut relay_lost) = (false, false);
    while !(disconnected && relay_lost) {
        let event = wait_for_event(&mut p.alice_rx, WAIT, |e| {
            matches!(
                e,
                NodeEvent::PeerDisconnected { .. } | NodeEvent::RelayDisconnected
            )
        })
        .await;
        match event {
            Some(NodeEvent::PeerDisconnected { peer }) => {
                assert_eq!(peer, p.bob_id);
                assert!(!disconnected, "disconnect reported twice");
                disconnected = true;
            }
            Some(NodeEvent::RelayDisconnected) => relay_lost = true,
            other => panic!("missing disconnect/relay loss: {other:?}"),
        }
    }
    assert!(p.alice.peers().await.is_empty());
    assert_eq!(p.alice.connection_id().await, None);

    // Bob is still joined; the channel closing and the relay's peer-left
    // race each other.
    let (mut disconnected, mut left) = (false, false);
    while !(disconnected && left) {
        let event = wait_for_event(&mut p.bob_rx, WAIT, |e| {
            matches!(
                e,
                NodeEvent::PeerDisconnected { .. } | NodeEvent::PeerLeft { .. }
            )
        })
        .await;
        match event {
            Some(NodeEvent::PeerDisconnected { peer }) => {
                assert_eq!(peer, p.alice_id);
                disconnected = true;
            }
            Some(NodeEvent::PeerLeft { peer }) => {
                assert_eq!(peer, p.alice_id);
                left = true;
            }
            other => panic!("bob never saw alice go: {other:?}"),
        }
    }
    assert!(p.bob.peers().await.is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected_at_start() {
    init_test_tracing();
    let mut config = LanbeamConfig::default();
    config.transfer.chunk_size = 0;

    let result = Node::start(
        &config,
        NodeIdentity::new("dev-x", "X"),
        Arc::new(SimNetwork::new().transport()),
    );
    match result {
        Err(LanbeamError::Config(e)) => assert!(e.to_string().contains("transfer.chunk_size")),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("chunk size 0 accepted"),
    }
}
