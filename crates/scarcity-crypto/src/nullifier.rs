//! Nullifier derivation and the Witness package hash.
//!
//! A nullifier marks exactly one spend event. It is deterministic from the
//! token secret, the token id, and the spend timestamp, so the same token
//! spent twice produces two nullifiers derived from the same secret and id:
//! reuse of one nullifier across distinct spend events is the defining
//! double-spend signal.

use crate::hash::{be64, sha256_concat};

/// Derive the spend nullifier.
///
/// `SHA-256(secret || utf8(token_id) || be64(timestamp_ms))`
pub fn derive_nullifier(secret: &[u8; 32], token_id: &str, timestamp_ms: i64) -> [u8; 32] {
    sha256_concat(&[secret, token_id.as_bytes(), &be64(timestamp_ms as u64)])
}

/// Hash of the transfer package fields submitted to the Witness.
///
/// `SHA-256(utf8(token_id) || be64(amount) || commitment || nullifier)`
pub fn package_hash(
    token_id: &str,
    amount: u64,
    commitment: &[u8; 32],
    nullifier: &[u8; 32],
) -> [u8; 32] {
    sha256_concat(&[token_id.as_bytes(), &be64(amount), commitment, nullifier])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullifier_deterministic() {
        let secret = [0xAA; 32];
        let n1 = derive_nullifier(&secret, "token-1", 1_700_000_000_000);
        let n2 = derive_nullifier(&secret, "token-1", 1_700_000_000_000);
        assert_eq!(n1, n2);
    }

    #[test]
    fn test_nullifier_varies_with_each_input() {
        let secret = [0xAA; 32];
        let base = derive_nullifier(&secret, "token-1", 1_700_000_000_000);
        assert_ne!(base, derive_nullifier(&[0xAB; 32], "token-1", 1_700_000_000_000));
        assert_ne!(base, derive_nullifier(&secret, "token-2", 1_700_000_000_000));
        assert_ne!(base, derive_nullifier(&secret, "token-1", 1_700_000_000_001));
    }

    #[test]
    fn test_package_hash_binds_all_fields() {
        let commitment = [0x01; 32];
        let nullifier = [0x02; 32];
        let base = package_hash("t", 100, &commitment, &nullifier);
        assert_ne!(base, package_hash("u", 100, &commitment, &nullifier));
        assert_ne!(base, package_hash("t", 101, &commitment, &nullifier));
        assert_ne!(base, package_hash("t", 100, &[0x03; 32], &nullifier));
        assert_ne!(base, package_hash("t", 100, &commitment, &[0x03; 32]));
    }
}
