//! Anti-spam proof-of-work.
//!
//! The difficulty target is a number of leading zero bits in
//! `SHA-256(challenge || be64(nonce))`. Difficulty 0 disables the gate
//! entirely: any nonce verifies.
//!
//! Solving is a synchronous compute interval. Callers on an async runtime
//! must not expect it to yield mid-search.

use crate::hash::{be64, sha256_concat};
use crate::{CryptoError, Result};

/// Find the smallest nonce whose hash meets the difficulty target.
///
/// Scans nonces from zero upward, so the returned nonce is the smallest
/// satisfying one.
///
/// # Errors
///
/// [`CryptoError::PowExhausted`] if the entire u64 nonce space is scanned
/// without a hit (unreachable for any practical difficulty).
pub fn solve(challenge: &[u8], difficulty: u32) -> Result<u64> {
    if difficulty == 0 {
        return Ok(0);
    }
    let mut nonce: u64 = 0;
    loop {
        let digest = sha256_concat(&[challenge, &be64(nonce)]);
        if count_leading_zero_bits(&digest) >= difficulty {
            return Ok(nonce);
        }
        nonce = nonce
            .checked_add(1)
            .ok_or(CryptoError::PowExhausted(difficulty))?;
    }
}

/// Verify a nonce against a challenge and difficulty target.
pub fn verify(challenge: &[u8], nonce: u64, difficulty: u32) -> bool {
    if difficulty == 0 {
        return true;
    }
    let digest = sha256_concat(&[challenge, &be64(nonce)]);
    count_leading_zero_bits(&digest) >= difficulty
}

/// Count leading zero bits in a byte slice.
fn count_leading_zero_bits(data: &[u8]) -> u32 {
    let mut count = 0u32;
    for byte in data {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_then_verify() {
        let challenge = b"scarcity pow test";
        for difficulty in [0u32, 1, 4, 8] {
            let nonce = solve(challenge, difficulty).expect("solve");
            assert!(verify(challenge, nonce, difficulty));
        }
    }

    #[test]
    fn test_difficulty_zero_accepts_any_nonce() {
        assert!(verify(b"x", 0, 0));
        assert!(verify(b"x", u64::MAX, 0));
    }

    #[test]
    fn test_smallest_nonce() {
        let challenge = b"minimality";
        let nonce = solve(challenge, 4).expect("solve");
        for earlier in 0..nonce {
            assert!(!verify(challenge, earlier, 4));
        }
    }

    #[test]
    fn test_wrong_nonce_rejected() {
        let challenge = b"strict";
        let nonce = solve(challenge, 8).expect("solve");
        // A solution for one challenge does not transfer to another.
        assert!(!verify(b"other challenge entirely", nonce, 8) || nonce == 0);
        assert!(verify(challenge, nonce, 8));
    }

    #[test]
    fn test_count_leading_zero_bits() {
        assert_eq!(count_leading_zero_bits(&[0x00, 0x00, 0xFF]), 16);
        assert_eq!(count_leading_zero_bits(&[0x00, 0x80, 0xFF]), 8);
        assert_eq!(count_leading_zero_bits(&[0x80]), 0);
        assert_eq!(count_leading_zero_bits(&[0x40]), 1);
        assert_eq!(count_leading_zero_bits(&[]), 0);
    }
}
