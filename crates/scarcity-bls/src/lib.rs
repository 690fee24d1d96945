//! # scarcity-bls
//!
//! BLS12-381 aggregate signature verification for Witness attestations.
//!
//! The federation signs in the min-pk configuration: 48-byte G1 public
//! keys, 96-byte G2 signatures. Verification aggregates the signer public
//! keys by G1 addition and checks the pairing
//! `e(G1, sig) == e(pk_agg, H(msg))`.
//!
//! This path runs only when the gateway returned the aggregated attestation
//! variant and the local config carries the signer public keys; otherwise
//! verification is delegated to the gateway.

use blst::min_pk::{PublicKey, Signature};
use blst::BLST_ERROR;

/// Hash-to-G2 ciphersuite used by the federation signers.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Compressed G1 public key length.
pub const PUBKEY_LEN: usize = 48;

/// Compressed G2 signature length.
pub const SIGNATURE_LEN: usize = 96;

/// Error types for aggregate verification.
#[derive(Debug, thiserror::Error)]
pub enum BlsError {
    /// A public key failed to decode or was off-curve.
    #[error("invalid public key at index {0}")]
    InvalidPublicKey(usize),

    /// The aggregate signature failed to decode.
    #[error("invalid aggregate signature")]
    InvalidSignature,

    /// No signer public keys were supplied.
    #[error("empty signer set")]
    EmptySignerSet,
}

/// Convenience result type for BLS operations.
pub type Result<T> = std::result::Result<T, BlsError>;

/// Verify a 96-byte aggregate signature over `message` against the signer
/// public keys.
///
/// Returns `Ok(true)` only when the pairing check passes. Decoding failures
/// are errors rather than `false` so callers can distinguish a malformed
/// attestation from an honest verification miss.
pub fn verify_aggregate(
    message: &[u8],
    aggregate_signature: &[u8],
    signer_public_keys: &[Vec<u8>],
) -> Result<bool> {
    if signer_public_keys.is_empty() {
        return Err(BlsError::EmptySignerSet);
    }

    let signature =
        Signature::from_bytes(aggregate_signature).map_err(|_| BlsError::InvalidSignature)?;

    let mut keys = Vec::with_capacity(signer_public_keys.len());
    for (index, raw) in signer_public_keys.iter().enumerate() {
        let key = PublicKey::from_bytes(raw).map_err(|_| BlsError::InvalidPublicKey(index))?;
        keys.push(key);
    }
    let key_refs: Vec<&PublicKey> = keys.iter().collect();

    let err = signature.fast_aggregate_verify(true, message, DST, &key_refs);
    Ok(err == BLST_ERROR::BLST_SUCCESS)
}

/// Byte-exact serialization of the message the witnesses sign.
///
/// `hash || le64(timestamp_ms) || utf8(network_id) || le64(sequence)` —
/// little-endian integers, matching the federation signers.
pub fn witness_message(
    hash: &[u8; 32],
    timestamp_ms: i64,
    network_id: &str,
    sequence: u64,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + 8 + network_id.len() + 8);
    message.extend_from_slice(hash);
    message.extend_from_slice(&(timestamp_ms as u64).to_le_bytes());
    message.extend_from_slice(network_id.as_bytes());
    message.extend_from_slice(&sequence.to_le_bytes());
    message
}
