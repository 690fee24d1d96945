//! # scarcity-token
//!
//! The token lifecycle engine: minting, transfer and receipt, splits and
//! merges, multi-party distribution, hash- and time-locked conditional
//! transfers, and two-phase cross-federation bridging.
//!
//! Ordering contract: a transfer package is returned to the caller only
//! after the Witness attestation is in hand, and a token is marked spent
//! only after its nullifier has been handed to gossip. Merge publishes all
//! of its nullifiers atomically; a partial merge is never visible.
//!
//! ## Modules
//!
//! - [`token`] — The in-memory [`Token`](token::Token)
//! - [`engine`] — The [`TokenEngine`](engine::TokenEngine)

pub mod engine;
pub mod token;

pub use engine::{SpendPublisher, TokenEngine};
pub use token::Token;

/// Error types for lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// A spend was attempted on an instance already marked spent.
    #[error("token already spent")]
    AlreadySpent,

    /// Gossip refused the nullifier: this node has seen it before.
    #[error("double-spend detected: {0}")]
    DoubleSpend(#[from] scarcity_gossip::GossipError),

    /// The package's attestation did not verify.
    #[error("invalid attestation")]
    InvalidAttestation,

    /// The package's ownership proof did not verify.
    #[error("invalid ownership proof")]
    InvalidOwnershipProof,

    /// Zero or otherwise unusable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(u64),

    /// Split/multi-party amounts do not sum to the source amount.
    #[error("amounts sum to {actual}, expected {expected}")]
    AmountMismatch { expected: u64, actual: u64 },

    /// Split amounts and recipients differ in length.
    #[error("{amounts} amounts for {recipients} recipients")]
    LengthMismatch { amounts: usize, recipients: usize },

    /// A hash-locked package was claimed without a preimage.
    #[error("hash-locked package requires a preimage")]
    PreimageRequired,

    /// The supplied preimage does not hash to the package's lock.
    #[error("preimage does not match hashlock")]
    WrongPreimage,

    /// A time-locked package was claimed at or after its timelock.
    #[error("timelock {timelock_ms} has expired")]
    TimelockExpired { timelock_ms: i64 },

    /// A refund was attempted before the timelock.
    #[error("timelock {timelock_ms} has not expired yet")]
    TimelockNotExpired { timelock_ms: i64 },

    /// A time-locked transfer was built without a refund key.
    #[error("time-locked transfer requires a refund key")]
    RefundKeyRequired,

    /// Refund on a package that carries no time lock.
    #[error("package has no time lock to refund")]
    NotTimeLocked,

    /// The Freebird adapter failed terminally.
    #[error(transparent)]
    Freebird(#[from] scarcity_freebird::FreebirdError),
}

/// Convenience result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, TokenError>;
