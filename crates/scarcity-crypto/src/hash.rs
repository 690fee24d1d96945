//! SHA-256 hashing over concatenated fields.
//!
//! Every hash in the core is SHA-256 over a concatenation of byte slices,
//! domain-separating UTF-8 strings, and big-endian 64-bit integers. The
//! helpers here keep the concatenation discipline in one place so wire
//! hashes stay byte-exact across crates.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 over the concatenation of the given parts.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// SHA-256 of a single slice.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256_concat(&[data])
}

/// Big-endian encoding of a u64 field.
///
/// Amounts, timestamps, and PoW nonces are hashed in this form.
pub fn be64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Constant-time equality for byte slices.
///
/// Unequal lengths compare unequal without inspecting contents.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_concat_equals_single_buffer() {
        let joined = sha256(b"hello world");
        let parts = sha256_concat(&[b"hello", b" ", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_be64_layout() {
        assert_eq!(be64(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(be64(u64::MAX), [0xFF; 8]);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"self"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
