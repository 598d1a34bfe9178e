//! Signaling client against a real relay on loopback.

use std::net::SocketAddr;
use std::time::Duration;

use lanbeam_common::ConnectionId;
use lanbeam_config::ClientConfig;
use lanbeam_peer::{NodeIdentity, SignalPayload, SignalingClient, SignalingEvent};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::helpers::{init_test_tracing, start_relay, wait_for_event};

fn client_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        relay_url: format!("ws://{addr}"),
        reconnect_delay_secs: 1,
        connect_timeout_secs: 5,
        ..ClientConfig::default()
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<SignalingEvent>) -> SignalingEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for signaling event")
        .expect("signaling events closed")
}

#[tokio::test]
async fn join_discover_signal_leave() {
    init_test_tracing();
    let (addr, store) = start_relay().await;

    let (alice, mut alice_rx) = SignalingClient::connect(
        client_config(addr),
        NodeIdentity::new("dev-a", "Alice"),
    );
    let alice_id = match next(&mut alice_rx).await {
        SignalingEvent::Connected { connection_id } => connection_id,
        other => panic!("unexpected {other:?}"),
    };
    match next(&mut alice_rx).await {
        SignalingEvent::ExistingPeers(peers) => assert!(peers.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(alice.connection_id().await, Some(alice_id.clone()));

    let (bob, mut bob_rx) =
        SignalingClient::connect(client_config(addr), NodeIdentity::new("dev-b", "Bob"));
    let bob_id = match next(&mut bob_rx).await {
        SignalingEvent::Connected { connection_id } => connection_id,
        other => panic!("unexpected {other:?}"),
    };
    match next(&mut bob_rx).await {
        SignalingEvent::ExistingPeers(peers) => {
            assert_eq!(peers.len(), 1);
            assert_eq!(peers[0].connection_id, alice_id);
            assert_eq!(peers[0].display_name, "Alice");
        }
        other => panic!("unexpected {other:?}"),
    }
    match next(&mut alice_rx).await {
        SignalingEvent::PeerJoined(info) => {
            assert_eq!(info.connection_id, bob_id);
            assert_eq!(info.device_id, "dev-b");
        }
        other => panic!("unexpected {other:?}"),
    }

    let offer = SignalPayload::Offer { sdp: "v=0".into() };
    bob.send_signal(&alice_id, offer.clone()).await.unwrap();
    match next(&mut alice_rx).await {
        SignalingEvent::Signal { sender, signal } => {
            assert_eq!(sender, bob_id);
            assert_eq!(signal, offer);
        }
        other => panic!("unexpected {other:?}"),
    }

    bob.disconnect().await;
    match next(&mut alice_rx).await {
        SignalingEvent::PeerLeft(id) => assert_eq!(id, bob_id),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn unreachable_relay_reports_error() {
    init_test_tracing();
    // Bind and drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (client, mut rx) =
        SignalingClient::connect(client_config(addr), NodeIdentity::new("d", "n"));
    match next(&mut rx).await {
        SignalingEvent::Error(message) => assert!(message.starts_with("connect failed")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!client.is_connected().await);
    client.disconnect().await;
}

async fn joined(rx: &mut mpsc::UnboundedReceiver<SignalingEvent>) -> ConnectionId {
    match next(rx).await {
        SignalingEvent::Connected { connection_id } => connection_id,
        other => panic!("unexpected {other:?}"),
    }
}

fn candidate(i: usize) -> SignalPayload {
    SignalPayload::Candidate {
        candidate: format!("candidate:{i}"),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    }
}

/// Floods `target` with candidates, then hands the client back.
fn flood(
    client: SignalingClient,
    target: ConnectionId,
    count: usize,
) -> tokio::task::JoinHandle<SignalingClient> {
    tokio::spawn(async move {
        for i in 0..count {
            client.send_signal(&target, candidate(i)).await.unwrap();
        }
        client
    })
}

#[tokio::test]
async fn unread_events_do_not_stall_outgoing_signals() {
    init_test_tracing();
    let (addr, _store) = start_relay().await;
    // Well past any internal queue depth in either direction.
    const COUNT: usize = 1000;

    let (alice, mut alice_rx) =
        SignalingClient::connect(client_config(addr), NodeIdentity::new("dev-a", "Alice"));
    let alice_id = joined(&mut alice_rx).await;
    let (bob, mut bob_rx) =
        SignalingClient::connect(client_config(addr), NodeIdentity::new("dev-b", "Bob"));
    let bob_id = joined(&mut bob_rx).await;

    // Neither side reads its events while both send.
    let alice_task = flood(alice, bob_id.clone(), COUNT);
    let bob_task = flood(bob, alice_id.clone(), COUNT);

    let alice = tokio::time::timeout(Duration::from_secs(10), alice_task)
        .await
        .expect("alice's signals stalled")
        .unwrap();
    let bob = tokio::time::timeout(Duration::from_secs(10), bob_task)
        .await
        .expect("bob's signals stalled")
        .unwrap();

    let received = wait_for_event(&mut alice_rx, Duration::from_secs(5), |e| {
        matches!(e, SignalingEvent::Signal { .. })
    })
    .await;
    match received {
        Some(SignalingEvent::Signal { sender, .. }) => assert_eq!(sender, bob_id),
        other => panic!("no signal reached alice: {other:?}"),
    }
    assert!(alice.is_connected().await);
    assert!(bob.is_connected().await);

    alice.disconnect().await;
    bob.disconnect().await;
}
