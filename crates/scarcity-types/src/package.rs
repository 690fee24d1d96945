//! Transfer, HTLC, and bridge packages.
//!
//! Packages are the inter-user wire format: everything a recipient needs to
//! validate and claim a spend. The protocol is closed to extension at the
//! wire level, so conditional forms are tagged unions rather than open
//! structures.

use serde::{Deserialize, Serialize};

use crate::attestation::Attestation;
use crate::Hash32;

/// A spend condition attached to an HTLC transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HtlcCondition {
    /// Hash-locked: claiming requires a preimage of `hashlock`.
    Hash {
        #[serde(with = "crate::hexbytes")]
        hashlock: Hash32,
    },
    /// Time-locked: claimable only before `timelock_ms`; refundable after.
    Time {
        #[serde(rename = "timelockMs")]
        timelock_ms: i64,
    },
}

/// The wire package handed from sender to receiver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPackage {
    /// Token identifier (32-byte random, hex).
    pub token_id: String,
    /// Token amount.
    pub amount: u64,
    /// Blinded recipient commitment.
    #[serde(with = "crate::hexbytes")]
    pub commitment: Hash32,
    /// Single-use spend marker for this transfer.
    #[serde(with = "crate::hexbytes")]
    pub nullifier: Hash32,
    /// Witness attestation over the package hash.
    pub proof: Attestation,
    /// Freebird ownership proof, when the sender could produce one.
    #[serde(
        with = "crate::hexbytes::opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub ownership_proof: Option<Hash32>,
    /// HTLC condition for conditional transfers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub condition: Option<HtlcCondition>,
    /// Refund public key (hex). Required for time-locked packages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refund_key: Option<String>,
}

impl TransferPackage {
    /// Whether this package carries a time lock that has expired at `now_ms`.
    pub fn timelock_expired(&self, now_ms: i64) -> bool {
        matches!(
            self.condition,
            Some(HtlcCondition::Time { timelock_ms }) if now_ms >= timelock_ms
        )
    }
}

/// Wire package for a merge: several source tokens spent into one fresh
/// token. One nullifier per source, one joint attestation over all of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePackage {
    /// Fresh identifier of the merged token.
    pub token_id: String,
    /// Sum of the source amounts.
    pub amount: u64,
    /// Blinded recipient commitment.
    #[serde(with = "crate::hexbytes")]
    pub commitment: Hash32,
    /// One spend nullifier per source token.
    pub nullifiers: Vec<String>,
    /// Joint attestation over the concatenated package data.
    pub proof: Attestation,
    #[serde(
        with = "crate::hexbytes::opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub ownership_proof: Option<Hash32>,
}

/// Two-phase cross-federation transfer package.
///
/// Phase one locks the token in the source federation; phase two mints it
/// in the target federation against the source attestation. Token id and
/// amount are preserved across the crossing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgePackage {
    pub source_federation_id: String,
    pub target_federation_id: String,
    /// Nullifier that locked the token in the source federation.
    #[serde(with = "crate::hexbytes")]
    pub source_lock_nullifier: Hash32,
    /// Source-federation attestation proving the lock.
    pub source_attestation: Attestation,
    /// Commitment to the target-federation recipient.
    #[serde(with = "crate::hexbytes")]
    pub target_mint_commitment: Hash32,
    /// Target-federation attestation over the mint, once issued.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_attestation: Option<Attestation>,
    pub token_id: String,
    pub amount: u64,
}
