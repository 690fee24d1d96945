//! Witness federation attestations.
//!
//! An attestation is a threshold-signed `{hash, timestamp}` tuple. The
//! federation returns one of two envelope forms: an array of per-witness
//! signatures (multi-sig) or a single aggregate BLS signature with an
//! explicit signer list. Both normalize into [`Attestation`]; the
//! federation-native envelope is preserved under `raw` so the gateway can
//! re-verify it later.

use serde::{Deserialize, Serialize};

use crate::Hash32;

/// Canonical attestation form used throughout the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// The 32-byte package hash that was timestamped.
    #[serde(with = "crate::hexbytes")]
    pub hash: Hash32,
    /// Witness-assigned wall-clock milliseconds.
    pub timestamp: i64,
    /// Opaque signatures. One entry per witness for the multi-sig form,
    /// exactly one entry for the BLS-aggregated form.
    pub signatures: Vec<String>,
    /// Witness identifiers. Always matches the signer set; for the
    /// aggregated form this is the explicit signer list.
    pub witness_ids: Vec<String>,
    /// True when `signatures` holds a single BLS aggregate over the
    /// `witness_ids` signer set.
    #[serde(default)]
    pub aggregated: bool,
    /// Federation-native envelope, kept verbatim for gateway verification.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw: Option<serde_json::Value>,
}

impl Attestation {
    /// Number of distinct signers behind this attestation.
    ///
    /// For the multi-sig form this is the signature count; for the
    /// aggregated form it is the signer-list length.
    pub fn signer_count(&self) -> usize {
        if self.aggregated {
            self.witness_ids.len()
        } else {
            self.signatures.len()
        }
    }

    /// Structural sanity: signatures and signer ids must line up.
    pub fn is_well_formed(&self) -> bool {
        if self.aggregated {
            self.signatures.len() == 1 && !self.witness_ids.is_empty()
        } else {
            !self.signatures.is_empty() && self.signatures.len() == self.witness_ids.len()
        }
    }

    /// Age of the attestation relative to `now_ms`, in milliseconds.
    ///
    /// Negative when the attestation timestamp lies in the future.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}
