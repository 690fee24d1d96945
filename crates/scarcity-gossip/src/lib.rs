//! # scarcity-gossip
//!
//! The anti-spam, duplicate-detection, and epidemic-propagation engine for
//! nullifiers. Each node keeps a seen-set of nullifiers with per-peer
//! arrival tallies; inbound messages pass a hardened pipeline (rate limit,
//! proof-of-work, timestamp window, ownership proof, witness verification)
//! before touching the seen-set, and misbehaving peers are scored down
//! until disconnect.
//!
//! ## Modules
//!
//! - [`core`] — The [`NullifierGossip`](core::NullifierGossip) engine
//! - [`subnet`] — Peer subnet diversity tallies

pub mod core;
pub mod subnet;

pub use crate::core::{GossipStats, NullifierGossip, PeerLink, ProofVerifier};

use scarcity_types::Attestation;

/// Gossip configuration. Field-per-knob, all enumerated.
#[derive(Clone, Debug)]
pub struct GossipConfig {
    /// Hard upper bound on the seen-set; exceeding it evicts oldest first.
    pub max_nullifiers: usize,
    /// Period between background prune sweeps.
    pub prune_interval_ms: u64,
    /// Entries older than this are dropped by the sweep. Exceeds the
    /// validator's token-age cutoff by a day to cover clock skew.
    pub max_nullifier_age_ms: i64,
    /// Score at or below which a peer is disconnected and purged.
    pub peer_score_threshold: i32,
    /// Attestation timestamps further ahead than this are rejected.
    pub max_timestamp_future_s: i64,
    /// Reject messages lacking an ownership proof.
    pub require_ownership_proof: bool,
    /// Leaky-bucket refill rate per inbound peer.
    pub rate_limit_per_sec: f64,
    /// Leaky-bucket burst capacity per inbound peer.
    pub rate_limit_burst: f64,
    /// Proof-of-work difficulty gate in leading zero bits; 0 disables.
    pub pow_difficulty: u32,
}

/// Validator token-age default; the gossip retention default adds a day.
const VALIDATOR_TOKEN_AGE_MS: i64 = 24 * 24 * 24 * 3_600 * 1_000;

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            max_nullifiers: 100_000,
            prune_interval_ms: 3_600_000,
            max_nullifier_age_ms: VALIDATOR_TOKEN_AGE_MS + 24 * 3_600 * 1_000,
            peer_score_threshold: -50,
            max_timestamp_future_s: 5,
            require_ownership_proof: false,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 20.0,
            pow_difficulty: 0,
        }
    }
}

/// Error types for gossip operations.
#[derive(Debug, thiserror::Error)]
pub enum GossipError {
    /// Publishing a nullifier already in the local seen-set. This is the
    /// sender's own double-spend alarm.
    #[error("nullifier already seen (double-spend)")]
    DoubleSpend,
}

/// Convenience result type for gossip operations.
pub type Result<T> = std::result::Result<T, GossipError>;

/// [`ProofVerifier`] implementation backed by the Witness adapter.
pub struct WitnessProofVerifier(pub std::sync::Arc<scarcity_witness::WitnessClient>);

impl ProofVerifier for WitnessProofVerifier {
    async fn verify_proof(&self, proof: &Attestation) -> bool {
        self.0.verify(proof).await
    }
}
