//! The nullifier gossip engine.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scarcity_crypto::pow;
use scarcity_types::{
    now_ms, Attestation, GossipMessage, Hash32, NullifierRecord, PeerDirection, PeerReputation,
    RateBucket,
};

use crate::subnet::{distinct_subnets, subnet_key};
use crate::{GossipConfig, GossipError, Result};

/// Seam to the peer transport.
///
/// The engine never sees sockets; it hands outbound messages to the link
/// and asks it to drop peers. Tests drive the pipeline with an in-memory
/// implementation.
#[async_trait::async_trait]
pub trait PeerLink: Send + Sync + 'static {
    /// Deliver a message to one peer. Returns false on failure; the engine
    /// skips failed peers and lets re-gossip heal them.
    async fn send(&self, peer_id: &str, message: &GossipMessage) -> bool;

    /// Drop the connection to a peer whose score fell through the floor.
    async fn disconnect(&self, peer_id: &str);
}

/// Seam to attestation verification (the Witness adapter in production).
pub trait ProofVerifier: Send + Sync + 'static {
    fn verify_proof(
        &self,
        proof: &Attestation,
    ) -> impl std::future::Future<Output = bool> + Send;
}

/// Snapshot of engine state for diagnostics.
#[derive(Clone, Debug)]
pub struct GossipStats {
    pub seen_nullifiers: usize,
    pub connected_peers: usize,
    /// Distinct /24 (or /48) subnets among peers with known addresses.
    pub subnet_diversity: usize,
    /// Outbound-initiated peers, weighted higher in diversity reporting.
    pub outbound_peers: usize,
}

impl GossipStats {
    /// Diversity figure for confidence reporting: distinct subnets, with
    /// outbound-initiated peers counted twice. Reporting only; peers are
    /// never filtered by this.
    pub fn diversity_weight(&self) -> f64 {
        if self.connected_peers == 0 {
            return 0.0;
        }
        let weighted = self.subnet_diversity + self.outbound_peers;
        (weighted as f64 / self.connected_peers as f64).min(2.0)
    }
}

struct PeerEntry {
    reputation: PeerReputation,
    bucket: RateBucket,
}

struct GossipState {
    /// Seen-set keyed by nullifier hex. Insertion is the last step of the
    /// receive path so an abandoned await never leaves a half-written entry.
    seen: HashMap<String, NullifierRecord>,
    peers: HashMap<String, PeerEntry>,
}

/// The nullifier gossip engine.
///
/// Single-owner state behind one async mutex: all mutation happens between
/// suspension points, matching the cooperative scheduling contract.
pub struct NullifierGossip<L, V> {
    config: GossipConfig,
    link: Arc<L>,
    verifier: Arc<V>,
    state: Mutex<GossipState>,
}

impl<L: PeerLink, V: ProofVerifier> NullifierGossip<L, V> {
    pub fn new(config: GossipConfig, link: Arc<L>, verifier: Arc<V>) -> Self {
        Self {
            config,
            link,
            verifier,
            state: Mutex::new(GossipState {
                seen: HashMap::new(),
                peers: HashMap::new(),
            }),
        }
    }

    /// Register a connected peer with a fresh reputation and a full bucket.
    pub async fn peer_connected(
        &self,
        peer_id: &str,
        direction: PeerDirection,
        addr: Option<IpAddr>,
    ) {
        let mut state = self.state.lock().await;
        let subnet = addr.map(|a| subnet_key(&a));
        state.peers.insert(
            peer_id.to_string(),
            PeerEntry {
                reputation: PeerReputation::new(direction, subnet),
                bucket: RateBucket::new(
                    self.config.rate_limit_burst,
                    self.config.rate_limit_per_sec,
                    now_ms(),
                ),
            },
        );
        debug!(peer = %peer_id, ?direction, "gossip peer registered");
    }

    /// Forget a peer that left on its own (no penalty involved).
    pub async fn peer_left(&self, peer_id: &str) {
        self.state.lock().await.peers.remove(peer_id);
    }

    /// Process one inbound gossip message from a peer.
    ///
    /// The pipeline order is fixed: rate limit, type gate, proof-of-work,
    /// timestamp window, ownership proof, witness verification, seen-set.
    /// Failures penalize the sender and never store a record; the seen-set
    /// insert is the final step.
    pub async fn handle_message(&self, from_peer: &str, message: GossipMessage) {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let now = now_ms();

        // Unknown senders get a fresh ledger rather than a panic; the
        // transport normally registers peers before delivering from them.
        let entry = state.peers.entry(from_peer.to_string()).or_insert_with(|| PeerEntry {
            reputation: PeerReputation::new(PeerDirection::Inbound, None),
            bucket: RateBucket::new(
                self.config.rate_limit_burst,
                self.config.rate_limit_per_sec,
                now,
            ),
        });

        // 1. Rate limit: empty bucket drops silently.
        if !entry.bucket.try_consume(now) {
            entry.reputation.dropped_messages += 1;
            return;
        }

        // 2. Type gate.
        let (nullifier, proof, ownership_proof, pow_nonce) = match message {
            GossipMessage::Ping { .. } => {
                let reply = GossipMessage::Pong { timestamp: now };
                drop(guard);
                self.link.send(from_peer, &reply).await;
                return;
            }
            GossipMessage::Pong { .. } => return,
            GossipMessage::Nullifier {
                nullifier,
                proof,
                ownership_proof,
                pow_nonce,
                ..
            } => (nullifier, proof, ownership_proof, pow_nonce),
        };

        // 3. Proof-of-work gate.
        if self.config.pow_difficulty > 0 {
            let solved = pow_nonce
                .is_some_and(|nonce| pow::verify(&nullifier, nonce, self.config.pow_difficulty));
            if !solved {
                self.penalize(state, from_peer, -5, "missing or invalid pow")
                    .await;
                return;
            }
        }

        // 4. Timestamp window.
        if proof.timestamp > now + self.config.max_timestamp_future_s * 1_000 {
            self.penalize(state, from_peer, -5, "attestation timestamp in the future")
                .await;
            return;
        }
        if proof.timestamp < now - self.config.max_nullifier_age_ms {
            self.penalize(state, from_peer, -2, "attestation older than retention window")
                .await;
            return;
        }

        // 5. Ownership-proof gate.
        if self.config.require_ownership_proof && ownership_proof.is_none() {
            self.penalize(state, from_peer, -5, "missing ownership proof")
                .await;
            return;
        }

        // 6. Witness verification. Nothing is stored on failure.
        if !self.verifier.verify_proof(&proof).await {
            if let Some(entry) = state.peers.get_mut(from_peer) {
                entry.reputation.invalid_proofs += 1;
            }
            self.penalize(state, from_peer, -10, "attestation failed verification")
                .await;
            return;
        }

        // 7. Seen-set: insert-or-tally.
        let key = hex::encode(nullifier);
        if let Some(record) = state.seen.get_mut(&key) {
            record.peer_count += 1;
            if let Some(entry) = state.peers.get_mut(from_peer) {
                entry.reputation.duplicates += 1;
            }
            self.penalize(state, from_peer, -1, "duplicate nullifier")
                .await;
            return;
        }

        state.seen.insert(
            key.clone(),
            NullifierRecord {
                nullifier,
                proof: proof.clone(),
                first_seen_ms: now,
                peer_count: 1,
            },
        );
        if let Some(entry) = state.peers.get_mut(from_peer) {
            entry.reputation.valid_messages += 1;
            entry.reputation.adjust(1);
        }
        debug!(nullifier = %key, from = %from_peer, "novel nullifier recorded");

        // Rebroadcast to everyone else, skipping failures.
        let forward = GossipMessage::Nullifier {
            nullifier,
            proof,
            timestamp: now,
            ownership_proof,
            pow_nonce,
        };
        let targets: Vec<String> = state
            .peers
            .keys()
            .filter(|id| id.as_str() != from_peer)
            .cloned()
            .collect();
        for target in targets {
            if !self.link.send(&target, &forward).await {
                debug!(peer = %target, "rebroadcast skipped failed peer");
            }
        }
    }

    /// Announce a local spend.
    ///
    /// Publishing a nullifier that is already in the seen-set is the
    /// sender's own double-spend alarm and fails without broadcasting.
    pub async fn publish(
        &self,
        nullifier: Hash32,
        proof: Attestation,
        ownership_proof: Option<Hash32>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let key = hex::encode(nullifier);
        if state.seen.contains_key(&key) {
            warn!(nullifier = %key, "publish refused: nullifier already seen");
            return Err(GossipError::DoubleSpend);
        }

        let pow_nonce = if self.config.pow_difficulty > 0 {
            pow::solve(&nullifier, self.config.pow_difficulty).ok()
        } else {
            None
        };

        let now = now_ms();
        state.seen.insert(
            key.clone(),
            NullifierRecord {
                nullifier,
                proof: proof.clone(),
                first_seen_ms: now,
                peer_count: 1,
            },
        );
        info!(nullifier = %key, "published local spend");

        let message = GossipMessage::Nullifier {
            nullifier,
            proof,
            timestamp: now,
            ownership_proof,
            pow_nonce,
        };
        let targets: Vec<String> = state.peers.keys().cloned().collect();
        for target in targets {
            if !self.link.send(&target, &message).await {
                debug!(peer = %target, "publish skipped failed peer");
            }
        }
        Ok(())
    }

    /// Announce several spends atomically (merge publishes one nullifier
    /// per source token).
    ///
    /// All keys are checked against the seen-set before anything is
    /// inserted, so either every nullifier publishes or none does; a
    /// partial merge is never observable to gossip.
    pub async fn publish_all(
        &self,
        spends: Vec<(Hash32, Attestation, Option<Hash32>)>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        for (nullifier, _, _) in &spends {
            if state.seen.contains_key(&hex::encode(nullifier)) {
                warn!(nullifier = %hex::encode(nullifier), "batch publish refused: nullifier already seen");
                return Err(GossipError::DoubleSpend);
            }
        }

        let now = now_ms();
        let targets: Vec<String> = state.peers.keys().cloned().collect();
        for (nullifier, proof, ownership_proof) in spends {
            let pow_nonce = if self.config.pow_difficulty > 0 {
                pow::solve(&nullifier, self.config.pow_difficulty).ok()
            } else {
                None
            };
            state.seen.insert(
                hex::encode(nullifier),
                NullifierRecord {
                    nullifier,
                    proof: proof.clone(),
                    first_seen_ms: now,
                    peer_count: 1,
                },
            );
            let message = GossipMessage::Nullifier {
                nullifier,
                proof,
                timestamp: now,
                ownership_proof,
                pow_nonce,
            };
            for target in &targets {
                if !self.link.send(target, &message).await {
                    debug!(peer = %target, "batch publish skipped failed peer");
                }
            }
        }
        Ok(())
    }

    /// Confidence that a nullifier has been spent, as the fraction of
    /// connected peers that reported it. Age is deliberately not a factor:
    /// a legitimate old transfer must not read as a double-spend.
    pub async fn check_nullifier(&self, nullifier: &Hash32) -> f64 {
        let state = self.state.lock().await;
        let Some(record) = state.seen.get(&hex::encode(nullifier)) else {
            return 0.0;
        };
        let peers = state.peers.len().max(1);
        (f64::from(record.peer_count) / peers as f64).min(1.0)
    }

    /// One prune sweep: drop entries past the retention window, then
    /// enforce the hard cap by evicting oldest-first.
    pub async fn prune_now(&self) {
        let mut state = self.state.lock().await;
        let cutoff = now_ms() - self.config.max_nullifier_age_ms;
        let before = state.seen.len();
        state.seen.retain(|_, record| record.first_seen_ms >= cutoff);

        if state.seen.len() > self.config.max_nullifiers {
            let mut by_age: Vec<(String, i64)> = state
                .seen
                .iter()
                .map(|(key, record)| (key.clone(), record.first_seen_ms))
                .collect();
            by_age.sort_by_key(|(_, first_seen)| *first_seen);
            let excess = state.seen.len() - self.config.max_nullifiers;
            for (key, _) in by_age.into_iter().take(excess) {
                state.seen.remove(&key);
            }
        }

        let removed = before - state.seen.len();
        if removed > 0 {
            info!(removed, remaining = state.seen.len(), "pruned nullifier seen-set");
        }
    }

    /// Spawn the background sweeper. Aborts with the returned handle.
    pub fn spawn_pruner(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let gossip = Arc::clone(self);
        let period = std::time::Duration::from_millis(gossip.config.prune_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                gossip.prune_now().await;
            }
        })
    }

    /// Diagnostics snapshot.
    pub async fn stats(&self) -> GossipStats {
        let state = self.state.lock().await;
        let subnets: Vec<String> = state
            .peers
            .values()
            .filter_map(|entry| entry.reputation.subnet.clone())
            .collect();
        GossipStats {
            seen_nullifiers: state.seen.len(),
            connected_peers: state.peers.len(),
            subnet_diversity: distinct_subnets(subnets.iter().map(String::as_str)),
            outbound_peers: state
                .peers
                .values()
                .filter(|entry| entry.reputation.direction == PeerDirection::Outbound)
                .count(),
        }
    }

    /// Reputation snapshot for one peer, when still connected.
    pub async fn peer_reputation(&self, peer_id: &str) -> Option<PeerReputation> {
        self.state
            .lock()
            .await
            .peers
            .get(peer_id)
            .map(|entry| entry.reputation.clone())
    }

    /// Apply a penalty and disconnect the peer if it fell through the floor.
    async fn penalize(
        &self,
        state: &mut GossipState,
        peer_id: &str,
        delta: i32,
        reason: &str,
    ) {
        let Some(entry) = state.peers.get_mut(peer_id) else {
            return;
        };
        entry.reputation.adjust(delta);
        let score = entry.reputation.score;
        debug!(peer = %peer_id, delta, score, %reason, "peer penalized");

        if score <= self.config.peer_score_threshold {
            warn!(peer = %peer_id, score, "peer fell below score threshold; disconnecting");
            state.peers.remove(peer_id);
            self.link.disconnect(peer_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory link that records every send and disconnect.
    #[derive(Default)]
    struct MockLink {
        sent: std::sync::Mutex<Vec<(String, GossipMessage)>>,
        disconnected: std::sync::Mutex<Vec<String>>,
        fail_sends: AtomicBool,
    }

    impl MockLink {
        fn sent_to(&self, peer: &str) -> usize {
            self.sent
                .lock()
                .expect("lock")
                .iter()
                .filter(|(id, _)| id == peer)
                .count()
        }

        fn disconnected_peers(&self) -> Vec<String> {
            self.disconnected.lock().expect("lock").clone()
        }
    }

    #[async_trait::async_trait]
    impl PeerLink for MockLink {
        async fn send(&self, peer_id: &str, message: &GossipMessage) -> bool {
            self.sent
                .lock()
                .expect("lock")
                .push((peer_id.to_string(), message.clone()));
            !self.fail_sends.load(Ordering::SeqCst)
        }

        async fn disconnect(&self, peer_id: &str) {
            self.disconnected
                .lock()
                .expect("lock")
                .push(peer_id.to_string());
        }
    }

    /// Verifier with a fixed verdict.
    struct FixedVerifier(bool);

    impl ProofVerifier for FixedVerifier {
        async fn verify_proof(&self, _proof: &Attestation) -> bool {
            self.0
        }
    }

    fn attestation(timestamp: i64) -> Attestation {
        Attestation {
            hash: [0x10; 32],
            timestamp,
            signatures: vec!["a".into(), "b".into()],
            witness_ids: vec!["w0".into(), "w1".into()],
            aggregated: false,
            raw: None,
        }
    }

    fn nullifier_message(nullifier: Hash32, timestamp: i64) -> GossipMessage {
        GossipMessage::Nullifier {
            nullifier,
            proof: attestation(timestamp),
            timestamp,
            ownership_proof: None,
            pow_nonce: None,
        }
    }

    fn engine(
        config: GossipConfig,
        verdict: bool,
    ) -> (Arc<MockLink>, NullifierGossip<MockLink, FixedVerifier>) {
        let link = Arc::new(MockLink::default());
        let gossip = NullifierGossip::new(config, link.clone(), Arc::new(FixedVerifier(verdict)));
        (link, gossip)
    }

    #[tokio::test]
    async fn test_publish_twice_raises_double_spend() {
        let (_, gossip) = engine(GossipConfig::default(), true);
        let n = [0x01; 32];
        gossip
            .publish(n, attestation(now_ms()), None)
            .await
            .expect("first publish");
        assert!(matches!(
            gossip.publish(n, attestation(now_ms()), None).await,
            Err(GossipError::DoubleSpend)
        ));
    }

    #[tokio::test]
    async fn test_novel_message_rebroadcasts_to_other_peers() {
        let (link, gossip) = engine(GossipConfig::default(), true);
        for peer in ["alice", "bob", "carol"] {
            gossip.peer_connected(peer, PeerDirection::Inbound, None).await;
        }
        gossip
            .handle_message("alice", nullifier_message([0x02; 32], now_ms()))
            .await;

        assert_eq!(gossip.check_nullifier(&[0x02; 32]).await, 1.0 / 3.0);
        assert_eq!(link.sent_to("bob"), 1);
        assert_eq!(link.sent_to("carol"), 1);
        assert_eq!(link.sent_to("alice"), 0);
        let rep = gossip.peer_reputation("alice").await.expect("alice");
        assert_eq!(rep.score, 1);
        assert_eq!(rep.valid_messages, 1);
    }

    #[tokio::test]
    async fn test_duplicate_increments_tally_and_penalizes() {
        let (link, gossip) = engine(GossipConfig::default(), true);
        gossip.peer_connected("alice", PeerDirection::Inbound, None).await;
        gossip.peer_connected("bob", PeerDirection::Inbound, None).await;

        let n = [0x03; 32];
        gossip.handle_message("alice", nullifier_message(n, now_ms())).await;
        let sent_before = link.sent_to("alice") + link.sent_to("bob");
        gossip.handle_message("bob", nullifier_message(n, now_ms())).await;

        // Tally rose, bob was penalized, and no rebroadcast happened.
        assert_eq!(gossip.check_nullifier(&n).await, 1.0);
        let rep = gossip.peer_reputation("bob").await.expect("bob");
        assert_eq!(rep.score, -1);
        assert_eq!(rep.duplicates, 1);
        assert_eq!(link.sent_to("alice") + link.sent_to("bob"), sent_before);
    }

    #[tokio::test]
    async fn test_rate_limit_drops_excess_silently() {
        let config = GossipConfig {
            rate_limit_burst: 3.0,
            rate_limit_per_sec: 0.001,
            ..GossipConfig::default()
        };
        let (_, gossip) = engine(config, true);
        gossip.peer_connected("flood", PeerDirection::Inbound, None).await;

        for i in 0..10u8 {
            gossip
                .handle_message("flood", nullifier_message([i; 32], now_ms()))
                .await;
        }

        let rep = gossip.peer_reputation("flood").await.expect("flood");
        assert_eq!(rep.dropped_messages, 7);
        assert_eq!(gossip.stats().await.seen_nullifiers, 3);
    }

    #[tokio::test]
    async fn test_invalid_proofs_disconnect_peer() {
        let (link, gossip) = engine(GossipConfig::default(), false);
        gossip.peer_connected("mallory", PeerDirection::Inbound, None).await;

        // -10 per invalid proof; the default threshold of -50 trips on the
        // fifth message.
        for i in 0..5u8 {
            gossip
                .handle_message("mallory", nullifier_message([0x40 + i; 32], now_ms()))
                .await;
        }

        assert!(gossip.peer_reputation("mallory").await.is_none());
        assert_eq!(link.disconnected_peers(), vec!["mallory".to_string()]);
        assert_eq!(gossip.stats().await.seen_nullifiers, 0);
    }

    #[tokio::test]
    async fn test_timestamp_window_rejections() {
        let (_, gossip) = engine(GossipConfig::default(), true);
        gossip.peer_connected("peer", PeerDirection::Inbound, None).await;

        // Future beyond the 5 s window.
        gossip
            .handle_message("peer", nullifier_message([0x05; 32], now_ms() + 60_000))
            .await;
        let rep = gossip.peer_reputation("peer").await.expect("peer");
        assert_eq!(rep.score, -5);

        // Older than the retention window.
        let ancient = now_ms() - GossipConfig::default().max_nullifier_age_ms - 1_000;
        gossip
            .handle_message("peer", nullifier_message([0x06; 32], ancient))
            .await;
        let rep = gossip.peer_reputation("peer").await.expect("peer");
        assert_eq!(rep.score, -7);

        assert_eq!(gossip.stats().await.seen_nullifiers, 0);
    }

    #[tokio::test]
    async fn test_ownership_proof_gate() {
        let config = GossipConfig {
            require_ownership_proof: true,
            ..GossipConfig::default()
        };
        let (_, gossip) = engine(config, true);
        gossip.peer_connected("peer", PeerDirection::Inbound, None).await;

        gossip
            .handle_message("peer", nullifier_message([0x07; 32], now_ms()))
            .await;
        assert_eq!(gossip.peer_reputation("peer").await.expect("peer").score, -5);

        let with_proof = GossipMessage::Nullifier {
            nullifier: [0x08; 32],
            proof: attestation(now_ms()),
            timestamp: now_ms(),
            ownership_proof: Some([0x09; 32]),
            pow_nonce: None,
        };
        gossip.handle_message("peer", with_proof).await;
        assert_eq!(gossip.stats().await.seen_nullifiers, 1);
    }

    #[tokio::test]
    async fn test_pow_gate() {
        let config = GossipConfig {
            pow_difficulty: 8,
            ..GossipConfig::default()
        };
        let (_, gossip) = engine(config, true);
        gossip.peer_connected("peer", PeerDirection::Inbound, None).await;

        let n = [0x0A; 32];
        gossip.handle_message("peer", nullifier_message(n, now_ms())).await;
        assert_eq!(gossip.peer_reputation("peer").await.expect("peer").score, -5);
        assert_eq!(gossip.stats().await.seen_nullifiers, 0);

        let nonce = pow::solve(&n, 8).expect("solve");
        let solved = GossipMessage::Nullifier {
            nullifier: n,
            proof: attestation(now_ms()),
            timestamp: now_ms(),
            ownership_proof: None,
            pow_nonce: Some(nonce),
        };
        gossip.handle_message("peer", solved).await;
        assert_eq!(gossip.stats().await.seen_nullifiers, 1);
    }

    #[tokio::test]
    async fn test_prune_cap_bounds_seen_set() {
        let config = GossipConfig {
            max_nullifiers: 5,
            ..GossipConfig::default()
        };
        let (_, gossip) = engine(config, true);
        gossip.peer_connected("peer", PeerDirection::Inbound, None).await;

        for i in 0..12u8 {
            gossip
                .handle_message("peer", nullifier_message([i; 32], now_ms()))
                .await;
        }
        gossip.prune_now().await;
        assert!(gossip.stats().await.seen_nullifiers <= 5);
    }

    #[tokio::test]
    async fn test_prune_age_eviction_keeps_newest() {
        let (_, gossip) = engine(GossipConfig::default(), true);
        gossip
            .publish([0x0B; 32], attestation(now_ms()), None)
            .await
            .expect("publish");
        gossip
            .publish([0x0C; 32], attestation(now_ms()), None)
            .await
            .expect("publish");

        // Backdate one record past the retention window.
        {
            let mut state = gossip.state.lock().await;
            let record = state
                .seen
                .get_mut(&hex::encode([0x0B; 32]))
                .expect("record");
            record.first_seen_ms = now_ms() - gossip.config.max_nullifier_age_ms - 1;
        }

        gossip.prune_now().await;
        assert_eq!(gossip.check_nullifier(&[0x0B; 32]).await, 0.0);
        assert!(gossip.check_nullifier(&[0x0C; 32]).await > 0.0);
    }

    #[tokio::test]
    async fn test_ping_answered_with_pong() {
        let (link, gossip) = engine(GossipConfig::default(), true);
        gossip.peer_connected("peer", PeerDirection::Inbound, None).await;
        gossip
            .handle_message("peer", GossipMessage::Ping { timestamp: now_ms() })
            .await;
        let sent = link.sent.lock().expect("lock");
        assert!(matches!(
            sent.as_slice(),
            [(peer, GossipMessage::Pong { .. })] if peer == "peer"
        ));
    }

    #[tokio::test]
    async fn test_subnet_diversity_in_stats() {
        let (_, gossip) = engine(GossipConfig::default(), true);
        gossip
            .peer_connected("a", PeerDirection::Outbound, Some("10.1.1.1".parse().expect("ip")))
            .await;
        gossip
            .peer_connected("b", PeerDirection::Inbound, Some("10.1.1.2".parse().expect("ip")))
            .await;
        gossip
            .peer_connected("c", PeerDirection::Inbound, Some("10.2.0.1".parse().expect("ip")))
            .await;

        let stats = gossip.stats().await;
        assert_eq!(stats.connected_peers, 3);
        assert_eq!(stats.subnet_diversity, 2);
        assert_eq!(stats.outbound_peers, 1);
        // (2 subnets + 1 outbound) / 3 peers.
        assert!((stats.diversity_weight() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_diversity_weight_empty() {
        let stats = GossipStats {
            seen_nullifiers: 0,
            connected_peers: 0,
            subnet_diversity: 0,
            outbound_peers: 0,
        };
        assert_eq!(stats.diversity_weight(), 0.0);
    }
}
