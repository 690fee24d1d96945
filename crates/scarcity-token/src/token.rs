//! The in-memory bearer token.

use zeroize::{Zeroize, ZeroizeOnDrop};

use scarcity_crypto::random_bytes32;

/// A bearer token held privately by its owner.
///
/// `id` and `amount` are immutable; `spent` flips to true exactly once and
/// no spend operation succeeds afterwards on the same instance. The secret
/// lives exactly as long as the token and is never transmitted; it is
/// wiped from memory on drop.
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct Token {
    /// 32-byte random identifier, hex.
    pub id: String,
    /// Token amount.
    pub amount: u64,
    /// 32-byte spend secret. Never leaves this process.
    pub secret: [u8; 32],
    /// Whether this instance has been spent.
    pub spent: bool,
}

impl Token {
    /// Mint a fresh token with a random id and secret.
    pub fn mint(amount: u64) -> Self {
        Self {
            id: hex::encode(random_bytes32()),
            amount,
            secret: random_bytes32(),
            spent: false,
        }
    }

    /// Rebuild a token instance from known parts (receive paths).
    pub fn from_parts(id: String, amount: u64, secret: [u8; 32]) -> Self {
        Self {
            id,
            amount,
            secret,
            spent: false,
        }
    }
}
