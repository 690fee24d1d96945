//! # scarcity-types
//!
//! Shared domain types used across the Scarcity workspace.
//!
//! ## Modules
//!
//! - [`attestation`] — Witness attestations (multi-sig and BLS-aggregated forms)
//! - [`package`] — Transfer, HTLC, and bridge packages
//! - [`gossip`] — Gossip wire messages and per-peer records
//! - [`config`] — Node configuration sections (witness / freebird / hypertoken / tor)
//! - [`hexbytes`] — Serde helpers for hex-encoded 32-byte fields

pub mod attestation;
pub mod config;
pub mod gossip;
pub mod hexbytes;
pub mod package;

pub use attestation::Attestation;
pub use gossip::{GossipMessage, NullifierRecord, PeerDirection, PeerReputation, RateBucket};
pub use package::{BridgePackage, HtlcCondition, MergePackage, TransferPackage};

/// A 32-byte hash value (nullifiers, commitments, package hashes).
pub type Hash32 = [u8; 32];

/// Wire context string for the Freebird VOPRF protocol.
pub const FREEBIRD_CONTEXT: &[u8] = b"freebird:v1";

/// Milliseconds since the Unix epoch.
///
/// All protocol timestamps (attestations, nullifier derivation, HTLC
/// timelocks) are wall-clock milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Outcome of a transfer validation run.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    /// Whether the package was admitted.
    pub valid: bool,
    /// Confidence score in [0.0, 1.0].
    pub confidence: f64,
    /// Reason identifying the tier that rejected, when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    /// An accepting result with the given confidence.
    pub fn accept(confidence: f64) -> Self {
        Self {
            valid: true,
            confidence,
            reason: None,
        }
    }

    /// A rejecting result naming the tier that failed.
    pub fn reject(confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            confidence,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_recent() {
        let t = now_ms();
        // After 2023-01-01 and before 2100.
        assert!(t > 1_672_531_200_000);
        assert!(t < 4_102_444_800_000);
    }

    #[test]
    fn test_validation_result_reject_carries_reason() {
        let r = ValidationResult::reject(0.2, "Double-spend detected");
        assert!(!r.valid);
        assert_eq!(r.reason.as_deref(), Some("Double-spend detected"));
    }
}
