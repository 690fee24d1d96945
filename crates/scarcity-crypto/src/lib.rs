//! # scarcity-crypto
//!
//! Cryptographic primitives for the Scarcity protocol. The suite is fixed:
//! SHA-256 for every hash in the core, no algorithm negotiation.
//!
//! ## Modules
//!
//! - [`hash`] — SHA-256 over concatenated fields, constant-time compare
//! - [`encoding`] — Hex codec helpers
//! - [`pow`] — Proof-of-work solver and verifier
//! - [`nullifier`] — Nullifier derivation and the package hash

pub mod encoding;
pub mod hash;
pub mod nullifier;
pub mod pow;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded value has the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Proof-of-work search space exhausted.
    #[error("proof-of-work search exhausted at difficulty {0}")]
    PowExhausted(u32),
}

/// Convenience result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Fill a fresh 32-byte array from the OS CSPRNG.
pub fn random_bytes32() -> [u8; 32] {
    let mut out = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes_distinct() {
        // Two draws colliding would mean a broken CSPRNG.
        assert_ne!(random_bytes32(), random_bytes32());
    }
}
