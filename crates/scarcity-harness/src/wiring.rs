//! Glue between the peer transport and the gossip engine.
//!
//! The transport delivers relay frames and peer events; this module feeds
//! them into the gossip receive pipeline and implements the gossip
//! [`PeerLink`] seam over the transport's send side.

use std::sync::Arc;

use tracing::{debug, warn};

use scarcity_gossip::{NullifierGossip, PeerLink, ProofVerifier};
use scarcity_transport::{PeerEvent, PeerTransport};
use scarcity_types::{GossipMessage, PeerDirection};

/// [`PeerLink`] over the hybrid transport. Sends ride whichever path the
/// transport picked; a disconnect is local only, since the relay offers
/// no way to evict a remote peer.
pub struct RelayLink(pub Arc<PeerTransport>);

#[async_trait::async_trait]
impl PeerLink for RelayLink {
    async fn send(&self, peer_id: &str, message: &GossipMessage) -> bool {
        let Ok(payload) = serde_json::to_value(message) else {
            return false;
        };
        self.0.send_to_peer(peer_id, &payload).await.is_ok()
    }

    async fn disconnect(&self, peer_id: &str) {
        debug!(peer = %peer_id, "peer evicted locally");
    }
}

/// Pump transport events and messages into a gossip engine.
///
/// Returns the pump task handle; aborting it detaches the engine from the
/// network without closing the transport.
pub async fn attach_gossip<V: ProofVerifier>(
    gossip: Arc<NullifierGossip<RelayLink, V>>,
    transport: Arc<PeerTransport>,
) -> Option<tokio::task::JoinHandle<()>> {
    let mut events = transport.subscribe_events();
    let mut messages = transport.take_messages().await?;

    // Seed the peer set with anyone already joined.
    for peer in transport.peers().await {
        gossip
            .peer_connected(&peer, PeerDirection::Inbound, None)
            .await;
    }

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(PeerEvent::Joined(peer)) => {
                        gossip.peer_connected(&peer, PeerDirection::Inbound, None).await;
                    }
                    Ok(PeerEvent::Left(peer)) => {
                        gossip.peer_left(&peer).await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "peer events lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                message = messages.recv() => match message {
                    Some(inbound) => {
                        match serde_json::from_value::<GossipMessage>(inbound.payload) {
                            Ok(message) => {
                                gossip.handle_message(&inbound.from_peer_id, message).await;
                            }
                            Err(e) => {
                                debug!(from = %inbound.from_peer_id, error = %e, "undecodable gossip payload dropped");
                            }
                        }
                    }
                    None => break,
                },
            }
        }
        debug!("gossip pump finished");
    }))
}
