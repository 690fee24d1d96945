//! Witness gateway HTTP wire structures.
//!
//! The federation returns one of two signature envelopes: an array of
//! per-witness signatures (multi-sig) or a single BLS aggregate with an
//! explicit signer list. Both are accepted and normalized.

use serde::{Deserialize, Serialize};

/// `GET {gateway}/v1/config` response.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    pub network_id: String,
    pub threshold: usize,
    #[serde(default)]
    pub witnesses: Vec<WitnessEntry>,
}

/// One federation member in the gateway config.
#[derive(Clone, Debug, Deserialize)]
pub struct WitnessEntry {
    pub id: String,
    #[allow(dead_code)]
    pub endpoint: Option<String>,
    /// Hex-encoded 48-byte G1 public key, when published.
    pub pubkey: Option<String>,
}

/// `POST {gateway}/v1/timestamp` request body.
#[derive(Clone, Debug, Serialize)]
pub struct TimestampRequest {
    /// Hex-encoded 32-byte package hash.
    pub hash: String,
}

/// Timestamp and lookup response envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct AttestationEnvelope {
    pub attestation: SignedAttestation,
}

/// Federation-native signed attestation.
#[derive(Clone, Debug, Deserialize)]
pub struct SignedAttestation {
    pub attestation: AttestationBody,
    pub signatures: SignaturesForm,
}

/// The signed body: what the witnesses actually hash and sign.
#[derive(Clone, Debug, Deserialize)]
pub struct AttestationBody {
    /// Hex-encoded 32-byte hash.
    pub hash: String,
    /// Witness-assigned wall-clock milliseconds.
    pub timestamp: i64,
    pub network_id: String,
    pub sequence: u64,
}

/// Multi-sig or BLS-aggregated signature set.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum SignaturesForm {
    /// One signature per witness.
    MultiSig(Vec<WitnessSignature>),
    /// A single aggregate over the listed signers.
    Aggregated {
        /// Hex-encoded 96-byte G2 aggregate signature.
        aggregate: String,
        signers: Vec<String>,
    },
}

/// One per-witness signature in the multi-sig form.
#[derive(Clone, Debug, Deserialize)]
pub struct WitnessSignature {
    pub witness_id: String,
    /// Opaque hex-encoded signature.
    pub signature: String,
}

/// `POST {gateway}/v1/verify` response body.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}
