//! In-process implementation of the peer-transport capability.
//!
//! [`SimNetwork`] pairs an offerer and an answerer through the session
//! descriptions they exchange: once the offerer applies the answer, both
//! sides get an open [`SimDataChannel`] and a `Connected` link state.
//! Used by tests and local demos; no sockets involved.
//!
//! # Example
//!
//! ```ignore
//! let net = SimNetwork::new();
//! let alice = ConnectionOrchestrator::new(Arc::new(net.transport()), signals_a);
//! let bob = ConnectionOrchestrator::new(Arc::new(net.transport()), signals_b);
//! ```

mod channel;
mod network;
mod transport;

pub use channel::SimDataChannel;
pub use network::SimNetwork;
pub use transport::{SimSession, SimTransport};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use lanbeam_common::ConnectionId;
    use tokio::sync::mpsc;

    use super::*;
    use crate::signal::SessionDescription;
    use crate::transport::{ChannelState, DataChannel, LinkState, PeerTransport, TransportEvent};

    async fn next_channel(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Arc<dyn DataChannel> {
        loop {
            match rx.recv().await.expect("events closed") {
                TransportEvent::ChannelOpen(ch) => return ch,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn offer_answer_opens_channel_on_both_sides() {
        let net = SimNetwork::new();
        let transport = net.transport();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let a = transport
            .create_session(&ConnectionId::from("b"), true, tx_a)
            .await
            .unwrap();
        let b = transport
            .create_session(&ConnectionId::from("a"), false, tx_b)
            .await
            .unwrap();

        let offer = a.create_offer().await.unwrap();
        a.set_local_description(offer.clone()).await.unwrap();
        b.set_remote_description(offer).await.unwrap();
        let answer = b.create_answer().await.unwrap();
        b.set_local_description(answer.clone()).await.unwrap();
        a.set_remote_description(answer).await.unwrap();

        let ch_a = next_channel(&mut rx_a).await;
        let ch_b = next_channel(&mut rx_b).await;
        assert_eq!(ch_a.ready_state(), ChannelState::Open);
        assert_eq!(ch_b.label(), crate::transport::CHANNEL_LABEL);

        ch_a.send(Bytes::from_static(b"ping")).await.unwrap();
        loop {
            match rx_b.recv().await.unwrap() {
                TransportEvent::ChannelMessage(data) => {
                    assert_eq!(&data[..], b"ping");
                    break;
                }
                _ => continue,
            }
        }

        ch_b.close();
        assert_eq!(ch_a.ready_state(), ChannelState::Closed);
        assert!(ch_a.send(Bytes::from_static(b"late")).await.is_err());
        loop {
            match rx_a.recv().await.unwrap() {
                TransportEvent::ChannelClosed => break,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn answer_requires_remote_offer() {
        let net = SimNetwork::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = net
            .transport()
            .create_session(&ConnectionId::from("x"), false, tx)
            .await
            .unwrap();
        assert!(session.create_answer().await.is_err());
    }

    #[tokio::test]
    async fn garbage_description_is_rejected() {
        let net = SimNetwork::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = net
            .transport()
            .create_session(&ConnectionId::from("x"), false, tx)
            .await
            .unwrap();
        let err = session
            .set_remote_description(SessionDescription::offer("v=0 not a sim sdp"))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn fail_all_reports_failed_link() {
        let net = SimNetwork::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = net
            .transport()
            .create_session(&ConnectionId::from("x"), true, tx)
            .await
            .unwrap();
        net.fail_all();
        match rx.recv().await.unwrap() {
            TransportEvent::LinkState(state) => assert_eq!(state, LinkState::Failed),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
