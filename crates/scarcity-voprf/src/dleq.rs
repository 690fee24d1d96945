//! Chaum-Pedersen DLEQ proofs.
//!
//! The issuer proves `log_G(Q) == log_A(B)`: the same secret key links its
//! advertised public key `Q` and its evaluation `B` of the blinded element
//! `A`. Transcript hashing is domain-separated by `"DLEQ-P256-v1"` joined
//! with the application context, length-prefixed so tag boundaries cannot
//! be confused with point data.

use p256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

use crate::group::{decode_scalar, encode_point, encode_scalar, scalar_from_digest};
use crate::{Result, VoprfError, PROOF_LEN};

/// Domain-separation tag prefix for the DLEQ transcript.
const DLEQ_TAG: &[u8] = b"DLEQ-P256-v1";

/// A DLEQ proof: challenge scalar `c` and response scalar `s`.
#[derive(Clone, Debug)]
pub struct DleqProof {
    pub c: Scalar,
    pub s: Scalar,
}

impl DleqProof {
    /// Parse the 64-byte wire form `c || s`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PROOF_LEN {
            return Err(VoprfError::Malformed(format!(
                "proof must be {PROOF_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            c: decode_scalar(&bytes[..32])?,
            s: decode_scalar(&bytes[32..])?,
        })
    }

    /// Wire form `c || s`.
    pub fn to_bytes(&self) -> [u8; PROOF_LEN] {
        let mut out = [0u8; PROOF_LEN];
        out[..32].copy_from_slice(&encode_scalar(&self.c));
        out[32..].copy_from_slice(&encode_scalar(&self.s));
        out
    }
}

/// Transcript challenge over (G, Q, A, B, t1, t2).
///
/// `SHA-256(be32(|tag|) || tag || G || Q || A || B || t1 || t2)` reduced mod
/// the curve order, where `tag = "DLEQ-P256-v1" || context` and all points
/// are compressed.
fn challenge(
    context: &[u8],
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    t1: &ProjectivePoint,
    t2: &ProjectivePoint,
) -> Scalar {
    let mut tag = Vec::with_capacity(DLEQ_TAG.len() + context.len());
    tag.extend_from_slice(DLEQ_TAG);
    tag.extend_from_slice(context);

    let mut hasher = Sha256::new();
    hasher.update((tag.len() as u32).to_be_bytes());
    hasher.update(&tag);
    hasher.update(encode_point(&ProjectivePoint::GENERATOR));
    hasher.update(encode_point(q));
    hasher.update(encode_point(a));
    hasher.update(encode_point(b));
    hasher.update(encode_point(t1));
    hasher.update(encode_point(t2));
    let digest: [u8; 32] = hasher.finalize().into();
    scalar_from_digest(&digest)
}

/// Verify a DLEQ proof that `log_G(Q) == log_A(B)`.
pub fn verify(
    context: &[u8],
    q: &ProjectivePoint,
    a: &ProjectivePoint,
    b: &ProjectivePoint,
    proof: &DleqProof,
) -> bool {
    let t1 = ProjectivePoint::GENERATOR * proof.s + *q * proof.c;
    let t2 = *a * proof.s + *b * proof.c;
    let expected = challenge(context, q, a, b, &t1, &t2);
    expected == proof.c
}

/// Produce a DLEQ proof for `B = A·k`, `Q = G·k`.
///
/// Federation-side reference implementation; the core uses it only to
/// simulate issuers in tests and the self-test harness.
pub fn prove(context: &[u8], secret_key: &Scalar, a: &ProjectivePoint) -> (ProjectivePoint, DleqProof) {
    use p256::elliptic_curve::Field;

    let b = *a * secret_key;
    let q = ProjectivePoint::GENERATOR * secret_key;
    let nonce = Scalar::random(&mut rand::rngs::OsRng);
    let t1 = ProjectivePoint::GENERATOR * nonce;
    let t2 = *a * nonce;
    let c = challenge(context, &q, a, &b, &t1, &t2);
    let s = nonce - c * secret_key;
    (b, DleqProof { c, s })
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::Field;
    use rand::rngs::OsRng;

    #[test]
    fn test_prove_verify() {
        let k = Scalar::random(&mut OsRng);
        let q = ProjectivePoint::GENERATOR * k;
        let a = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (b, proof) = prove(b"ctx", &k, &a);
        assert!(verify(b"ctx", &q, &a, &b, &proof));
    }

    #[test]
    fn test_wrong_context_rejected() {
        let k = Scalar::random(&mut OsRng);
        let q = ProjectivePoint::GENERATOR * k;
        let a = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (b, proof) = prove(b"ctx", &k, &a);
        assert!(!verify(b"other", &q, &a, &b, &proof));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let k = Scalar::random(&mut OsRng);
        let a = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (b, proof) = prove(b"ctx", &k, &a);
        let wrong_q = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        assert!(!verify(b"ctx", &wrong_q, &a, &b, &proof));
    }

    #[test]
    fn test_tampered_evaluation_rejected() {
        let k = Scalar::random(&mut OsRng);
        let q = ProjectivePoint::GENERATOR * k;
        let a = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (b, proof) = prove(b"ctx", &k, &a);
        let tampered = b + ProjectivePoint::GENERATOR;
        assert!(!verify(b"ctx", &q, &a, &tampered, &proof));
    }

    #[test]
    fn test_proof_codec_roundtrip() {
        let k = Scalar::random(&mut OsRng);
        let a = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (_, proof) = prove(b"ctx", &k, &a);
        let restored = DleqProof::from_bytes(&proof.to_bytes()).expect("decode");
        assert_eq!(restored.to_bytes(), proof.to_bytes());
    }
}
