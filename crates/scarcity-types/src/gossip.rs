//! Gossip wire messages and per-peer bookkeeping records.

use serde::{Deserialize, Serialize};

use crate::attestation::Attestation;
use crate::Hash32;

/// A message on the nullifier gossip overlay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GossipMessage {
    /// A spend announcement: the nullifier plus its Witness attestation.
    #[serde(rename_all = "camelCase")]
    Nullifier {
        #[serde(with = "crate::hexbytes")]
        nullifier: Hash32,
        proof: Attestation,
        /// Sender-local send time, milliseconds.
        timestamp: i64,
        #[serde(
            with = "crate::hexbytes::opt",
            skip_serializing_if = "Option::is_none",
            default
        )]
        ownership_proof: Option<Hash32>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pow_nonce: Option<u64>,
    },
    /// Liveness probe.
    Ping { timestamp: i64 },
    /// Liveness reply.
    Pong { timestamp: i64 },
}

/// Per-node cache entry for a seen nullifier.
#[derive(Clone, Debug)]
pub struct NullifierRecord {
    pub nullifier: Hash32,
    pub proof: Attestation,
    /// When this node first learned of the nullifier, milliseconds.
    pub first_seen_ms: i64,
    /// Distinct arrivals of this nullifier. A count above one signals
    /// epidemic convergence or a double-spend announced by several peers.
    pub peer_count: u32,
}

/// Whether the peer connection was initiated by us or by them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerDirection {
    Inbound,
    Outbound,
}

/// Reputation state for one connected peer.
///
/// The score starts at zero, is rewarded for novel valid messages and
/// penalized for protocol violations, and is capped at 100. Reaching the
/// configured threshold disconnects the peer and purges these stats.
#[derive(Clone, Debug)]
pub struct PeerReputation {
    pub score: i32,
    pub invalid_proofs: u32,
    pub duplicates: u32,
    pub valid_messages: u32,
    pub dropped_messages: u32,
    /// Subnet key (IPv4 /24 or IPv6 /48) when the peer address is known.
    pub subnet: Option<String>,
    pub direction: PeerDirection,
}

impl PeerReputation {
    /// Fresh reputation for a newly connected peer.
    pub fn new(direction: PeerDirection, subnet: Option<String>) -> Self {
        Self {
            score: 0,
            invalid_proofs: 0,
            duplicates: 0,
            valid_messages: 0,
            dropped_messages: 0,
            subnet,
            direction,
        }
    }

    /// Apply a score delta, saturating at the +100 cap.
    pub fn adjust(&mut self, delta: i32) {
        self.score = (self.score + delta).min(100);
    }
}

/// Leaky-bucket rate limiter state for one inbound peer.
#[derive(Clone, Debug)]
pub struct RateBucket {
    pub tokens: f64,
    pub capacity: f64,
    pub refill_per_sec: f64,
    pub last_refill_ms: i64,
}

impl RateBucket {
    /// A full bucket.
    pub fn new(capacity: f64, refill_per_sec: f64, now_ms: i64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill_ms: now_ms,
        }
    }

    /// Refill for elapsed time, then try to consume one token.
    ///
    /// Returns false when the bucket is empty (the message must be dropped).
    pub fn try_consume(&mut self, now_ms: i64) -> bool {
        let elapsed_s = (now_ms - self.last_refill_ms).max(0) as f64 / 1000.0;
        self.tokens = (self.tokens + elapsed_s * self.refill_per_sec).min(self.capacity);
        self.last_refill_ms = now_ms;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gossip_message_tagging() {
        let ping = GossipMessage::Ping { timestamp: 42 };
        let json = serde_json::to_value(&ping).expect("serialize");
        assert_eq!(json["type"], "ping");

        let msg = GossipMessage::Nullifier {
            nullifier: [0x01; 32],
            proof: Attestation {
                hash: [0x02; 32],
                timestamp: 1_700_000_000_000,
                signatures: vec!["s".into(), "t".into()],
                witness_ids: vec!["w0".into(), "w1".into()],
                aggregated: false,
                raw: None,
            },
            timestamp: 1_700_000_000_001,
            ownership_proof: Some([0x03; 32]),
            pow_nonce: Some(7),
        };
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "nullifier");
        assert!(json.get("ownershipProof").is_some());
        assert_eq!(json["powNonce"], 7);
        let back: GossipMessage = serde_json::from_value(json).expect("deserialize");
        match back {
            GossipMessage::Nullifier { pow_nonce, .. } => assert_eq!(pow_nonce, Some(7)),
            other => unreachable!("expected nullifier message, got {other:?}"),
        }
    }

    #[test]
    fn test_reputation_cap() {
        let mut rep = PeerReputation::new(PeerDirection::Inbound, None);
        for _ in 0..200 {
            rep.adjust(1);
        }
        assert_eq!(rep.score, 100);
        rep.adjust(-10);
        assert_eq!(rep.score, 90);
    }

    #[test]
    fn test_rate_bucket_drains_and_refills() {
        let mut bucket = RateBucket::new(2.0, 1.0, 0);
        assert!(bucket.try_consume(0));
        assert!(bucket.try_consume(0));
        assert!(!bucket.try_consume(0));
        // After one second a token is back.
        assert!(bucket.try_consume(1_000));
        assert!(!bucket.try_consume(1_000));
    }

    #[test]
    fn test_rate_bucket_never_exceeds_capacity() {
        let mut bucket = RateBucket::new(3.0, 10.0, 0);
        // Long idle period must not accumulate beyond capacity.
        assert!(bucket.try_consume(60_000));
        assert!(bucket.try_consume(60_000));
        assert!(bucket.try_consume(60_000));
        assert!(!bucket.try_consume(60_000));
    }
}
