//! # scarcity-wallet
//!
//! On-disk persistence consumed by the CLI and web-wallet collaborators:
//! wallet keypairs, the token store, and the node config document. All
//! three are JSON files rewritten atomically (write-temp then rename).
//!
//! ## Modules
//!
//! - [`keys`] — Ed25519 wallet keypairs and their persisted records
//! - [`store`] — Wallet and token stores
//! - [`paths`] — Data-directory resolution and config persistence

pub mod keys;
pub mod paths;
pub mod store;

pub use keys::{WalletKeypair, WalletRecord};
pub use store::{TokenRecord, TokenStore, WalletStore};

/// Error types for persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Filesystem failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A store file held invalid JSON.
    #[error("corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Named wallet or token not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A wallet with the same name already exists.
    #[error("wallet name taken: {0}")]
    NameTaken(String),

    /// A stored hex field failed to decode.
    #[error("invalid stored key material: {0}")]
    InvalidKeyMaterial(String),

    /// Spend attempt on a token already recorded as spent.
    #[error("token already spent: {0}")]
    AlreadySpent(String),
}

/// Convenience result type for persistence operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Atomically replace `path` with `contents`.
///
/// Writes a sibling temp file and renames it over the target, so readers
/// never observe a half-written store.
pub(crate) fn atomic_write(path: &std::path::Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
