//! # scarcity-voprf
//!
//! NIST P-256 VOPRF (RFC 9497) client side — Verifiable Oblivious
//! Pseudorandom Function with DLEQ proof verification.
//!
//! The issuer evaluates blinded elements without learning the input; the
//! client verifies, via a Chaum-Pedersen DLEQ proof, that the issuer used
//! the key behind its advertised public key, then unblinds.
//!
//! ## Protocol Flow
//!
//! 1. Client blinds: `(blinded, state) = blind(input, context)`
//! 2. Issuer evaluates and proves: `token = A || B || proof`
//! 3. Client finalizes: `output = finalize(state, token, issuer_pk, context)`
//!
//! ## Modules
//!
//! - [`group`] — hash-to-curve and point/scalar codec helpers
//! - [`dleq`] — DLEQ transcript hashing, verification, and the prover
//!   (federation-side reference, also used by local simulation)
//! - [`client`] — blind / finalize / Lagrange aggregation

pub mod client;
pub mod dleq;
pub mod group;

pub use client::{aggregate, blind, finalize, BlindState, PartialEvaluation};

/// Size of a compressed P-256 point on the wire.
pub const POINT_LEN: usize = 33;

/// Size of a DLEQ proof on the wire: challenge scalar || response scalar.
pub const PROOF_LEN: usize = 64;

/// Size of an issued token: A || B || proof.
pub const TOKEN_LEN: usize = 2 * POINT_LEN + PROOF_LEN;

/// Error types for VOPRF operations.
#[derive(Debug, thiserror::Error)]
pub enum VoprfError {
    /// A point or scalar failed to decode. Treat the issuer as adversarial.
    #[error("malformed encoding: {0}")]
    Malformed(String),

    /// The DLEQ proof did not verify. Treat the issuer as adversarial.
    #[error("DLEQ proof verification failed")]
    DleqMismatch,

    /// Hash-to-curve failed (effectively unreachable for valid inputs).
    #[error("hash-to-curve failed: {0}")]
    HashToCurve(String),

    /// A blinding or interpolation scalar was not invertible.
    #[error("degenerate scalar: {0}")]
    DegenerateScalar(String),
}

/// Convenience result type for VOPRF operations.
pub type Result<T> = std::result::Result<T, VoprfError>;
