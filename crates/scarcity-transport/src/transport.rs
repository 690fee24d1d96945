//! The hybrid peer transport event loop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::direct::{self, DirectNode};
use crate::frames::{self, RelayFrame};
use crate::{Result, TransportError, CLOSE_TIMEOUT, READY_TIMEOUT};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Transport configuration.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Relay WebSocket URL.
    pub relay_url: String,
    /// Delay between a peer joining and the direct-channel upgrade attempt.
    pub upgrade_delay_ms: u64,
    /// Whether to attempt direct-channel upgrades at all.
    pub enable_direct: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:8520".to_string(),
            upgrade_delay_ms: 2_000,
            enable_direct: true,
        }
    }
}

/// A routed application message delivered to the consumer.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub from_peer_id: String,
    pub payload: serde_json::Value,
}

/// Peer membership events observed on the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    Joined(String),
    Left(String),
}

#[derive(Default)]
struct PeerState {
    /// Live direct channel, when the upgrade succeeded. Cleared on the
    /// first send failure so traffic falls back to the relay.
    direct: Option<quinn::Connection>,
}

struct Shared {
    our_peer_id: String,
    ws_tx: Mutex<WsSink>,
    peers: Mutex<HashMap<String, PeerState>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    events_tx: broadcast::Sender<PeerEvent>,
    direct: Option<DirectNode>,
    upgrade_delay: Duration,
    closed: AtomicBool,
}

/// Peer-addressable message bus over the relay, with transparent
/// direct-channel upgrades.
pub struct PeerTransport {
    shared: Arc<Shared>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PeerTransport {
    /// Connect to the relay and wait for the `welcome` frame.
    ///
    /// Fails hard if `ready` is not reached within ten seconds.
    pub async fn connect(config: TransportConfig) -> Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(&config.relay_url)
            .await
            .map_err(|e| TransportError::Relay(e.to_string()))?;
        let (ws_tx, mut ws_rx) = socket.split();

        let our_peer_id = tokio::time::timeout(READY_TIMEOUT, await_welcome(&mut ws_rx))
            .await
            .map_err(|_| TransportError::ReadyTimeout(READY_TIMEOUT))??;
        info!(peer_id = %our_peer_id, relay = %config.relay_url, "transport ready");

        let direct = if config.enable_direct {
            match DirectNode::bind() {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(error = %e, "direct channels unavailable; relay-only mode");
                    None
                }
            }
        } else {
            None
        };

        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(64);

        let shared = Arc::new(Shared {
            our_peer_id,
            ws_tx: Mutex::new(ws_tx),
            peers: Mutex::new(HashMap::new()),
            inbound_tx,
            events_tx,
            direct,
            upgrade_delay: Duration::from_millis(config.upgrade_delay_ms),
            closed: AtomicBool::new(false),
        });

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(relay_reader(shared.clone(), ws_rx)));
        if shared.direct.is_some() {
            tasks.push(tokio::spawn(direct_acceptor(shared.clone())));
        }

        Ok(Self {
            shared,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            tasks: Mutex::new(tasks),
        })
    }

    /// The peer id the relay assigned to this node.
    pub fn peer_id(&self) -> &str {
        &self.shared.our_peer_id
    }

    /// Currently known peers.
    pub async fn peers(&self) -> Vec<String> {
        self.shared.peers.lock().await.keys().cloned().collect()
    }

    /// Take the inbound message stream. Single-consumer; the first call
    /// wins and later calls return `None`.
    pub async fn take_messages(&self) -> Option<mpsc::Receiver<InboundMessage>> {
        self.inbound_rx.lock().await.take()
    }

    /// Subscribe to peer join/leave events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PeerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Send a payload to one peer.
    ///
    /// Routes over the direct channel when one is up, transparently
    /// falling back to the relay on failure. The caller cannot observe
    /// which path carried the message.
    pub async fn send_to_peer(&self, peer_id: &str, payload: &serde_json::Value) -> Result<()> {
        send_to_peer(&self.shared, peer_id, payload).await
    }

    /// Broadcast a payload to every known peer, skipping failures.
    ///
    /// Returns the number of peers that accepted the send.
    pub async fn broadcast(&self, payload: &serde_json::Value) -> usize {
        let peers = self.peers().await;
        let mut delivered = 0;
        for peer in peers {
            match send_to_peer(&self.shared, &peer, payload).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!(peer = %peer, error = %e, "broadcast send skipped"),
            }
        }
        delivered
    }

    /// Close the transport: peers are cleared, in-flight sends fail with
    /// "not connected", and the socket teardown races a two-second ceiling.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        if let Some(direct) = &self.shared.direct {
            direct.close();
        }
        self.shared.peers.lock().await.clear();
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut ws = self.shared.ws_tx.lock().await;
            let _ = ws.send(Message::Close(None)).await;
        })
        .await;
        info!("transport closed");
    }
}

/// Read frames until the relay says `welcome`.
async fn await_welcome(ws_rx: &mut WsSource) -> Result<String> {
    while let Some(message) = ws_rx.next().await {
        let message = message.map_err(|e| TransportError::Relay(e.to_string()))?;
        if let Message::Text(text) = message {
            if let Ok(RelayFrame::Welcome { peer_id }) = RelayFrame::decode(&text) {
                return Ok(peer_id);
            }
        }
    }
    Err(TransportError::Relay("closed before welcome".to_string()))
}

/// Shared send path used by both the public API and internal signaling.
async fn send_to_peer(
    shared: &Arc<Shared>,
    peer_id: &str,
    payload: &serde_json::Value,
) -> Result<()> {
    if shared.closed.load(Ordering::SeqCst) {
        return Err(TransportError::NotConnected);
    }

    let direct_conn = {
        let peers = shared.peers.lock().await;
        let state = peers
            .get(peer_id)
            .ok_or_else(|| TransportError::UnknownPeer(peer_id.to_string()))?;
        state.direct.clone()
    };

    if let Some(connection) = direct_conn {
        let bytes =
            serde_json::to_vec(payload).map_err(|e| TransportError::Codec(e.to_string()))?;
        match direct::send_frame(&connection, &bytes).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!(peer = %peer_id, error = %e, "direct send failed; falling back to relay");
                if let Some(state) = shared.peers.lock().await.get_mut(peer_id) {
                    state.direct = None;
                }
            }
        }
    }

    let frame = RelayFrame::P2p {
        target_peer_id: Some(peer_id.to_string()),
        from_peer_id: None,
        payload: payload.clone(),
    };
    let text = frame.encode()?;
    shared
        .ws_tx
        .lock()
        .await
        .send(Message::Text(text))
        .await
        .map_err(|e| TransportError::Relay(e.to_string()))
}

/// Main relay read loop: peer membership, signaling, and delivery.
async fn relay_reader(shared: Arc<Shared>, mut ws_rx: WsSource) {
    while let Some(message) = ws_rx.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let frame = match RelayFrame::decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "undecodable relay frame dropped");
                continue;
            }
        };
        match frame {
            RelayFrame::Welcome { .. } => {}
            RelayFrame::PeerJoined { peer_id } => {
                debug!(peer = %peer_id, "peer joined");
                shared
                    .peers
                    .lock()
                    .await
                    .insert(peer_id.clone(), PeerState::default());
                let _ = shared.events_tx.send(PeerEvent::Joined(peer_id.clone()));
                maybe_schedule_upgrade(&shared, peer_id);
            }
            RelayFrame::PeerLeft { peer_id } => {
                debug!(peer = %peer_id, "peer left");
                if let Some(state) = shared.peers.lock().await.remove(&peer_id) {
                    if let Some(connection) = state.direct {
                        connection.close(quinn::VarInt::from_u32(0), b"peer left");
                    }
                }
                let _ = shared.events_tx.send(PeerEvent::Left(peer_id));
            }
            RelayFrame::P2p {
                from_peer_id: Some(from),
                payload,
                ..
            } => {
                if frames::is_signaling(&payload) {
                    handle_signaling(&shared, &from, payload).await;
                } else {
                    let _ = shared
                        .inbound_tx
                        .send(InboundMessage {
                            from_peer_id: from,
                            payload,
                        })
                        .await;
                }
            }
            RelayFrame::P2p {
                from_peer_id: None, ..
            } => {
                debug!("p2p frame without sender dropped");
            }
        }
    }
    shared.closed.store(true, Ordering::SeqCst);
    debug!("relay reader finished");
}

/// Offer a direct channel after the configured delay.
///
/// Only the side with the lexicographically smaller peer id offers, so the
/// two ends do not race each other with crossing upgrades.
fn maybe_schedule_upgrade(shared: &Arc<Shared>, peer_id: String) {
    let Some(direct) = &shared.direct else {
        return;
    };
    if shared.our_peer_id >= peer_id {
        return;
    }
    let addr = direct.local_addr();
    let shared = shared.clone();
    tokio::spawn(async move {
        tokio::time::sleep(shared.upgrade_delay).await;
        if shared.closed.load(Ordering::SeqCst)
            || !shared.peers.lock().await.contains_key(&peer_id)
        {
            return;
        }
        let offer = frames::direct_offer(&addr.to_string());
        if let Err(e) = send_to_peer(&shared, &peer_id, &offer).await {
            debug!(peer = %peer_id, error = %e, "direct offer not delivered");
        }
    });
}

/// React to transport-internal signaling payloads.
async fn handle_signaling(shared: &Arc<Shared>, from: &str, payload: serde_json::Value) {
    let kind = payload.get("type").and_then(|t| t.as_str()).unwrap_or("");
    if kind != frames::DIRECT_OFFER {
        debug!(%kind, "unknown signaling payload dropped");
        return;
    }
    let Some(direct) = &shared.direct else {
        return;
    };
    let Some(addr) = payload
        .get("addr")
        .and_then(|a| a.as_str())
        .and_then(|a| a.parse::<SocketAddr>().ok())
    else {
        debug!(peer = %from, "direct offer without usable address");
        return;
    };

    match direct.connect(addr, &shared.our_peer_id).await {
        Ok(connection) => {
            adopt_direct_channel(shared, from.to_string(), connection).await;
        }
        Err(e) => {
            debug!(peer = %from, error = %e, "direct dial failed; staying on relay");
        }
    }
}

/// Record an established direct channel and start its receive loop.
async fn adopt_direct_channel(shared: &Arc<Shared>, peer_id: String, connection: quinn::Connection) {
    {
        let mut peers = shared.peers.lock().await;
        let state = peers.entry(peer_id.clone()).or_default();
        state.direct = Some(connection.clone());
    }
    info!(peer = %peer_id, "direct channel up");

    let shared = shared.clone();
    tokio::spawn(async move {
        loop {
            match direct::recv_frame(&connection).await {
                Ok(raw) => {
                    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&raw) else {
                        debug!(peer = %peer_id, "undecodable direct frame dropped");
                        continue;
                    };
                    let _ = shared
                        .inbound_tx
                        .send(InboundMessage {
                            from_peer_id: peer_id.clone(),
                            payload,
                        })
                        .await;
                }
                Err(_) => break,
            }
        }
        // Channel died: fall back to the relay for this peer.
        if let Some(state) = shared.peers.lock().await.get_mut(&peer_id) {
            state.direct = None;
        }
        debug!(peer = %peer_id, "direct channel down; relay fallback");
    });
}

/// Accept inbound direct channels from peers that received our offer.
async fn direct_acceptor(shared: Arc<Shared>) {
    let Some(direct) = &shared.direct else {
        return;
    };
    while let Some((peer_id, connection)) = direct.accept().await {
        if !shared.peers.lock().await.contains_key(&peer_id) {
            debug!(peer = %peer_id, "direct connection from unknown peer rejected");
            connection.close(quinn::VarInt::from_u32(2), b"unknown peer");
            continue;
        }
        adopt_direct_channel(&shared, peer_id, connection).await;
    }
}
