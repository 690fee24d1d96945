//! Wallet and token stores.
//!
//! Each store is a JSON array on disk, loaded whole and rewritten
//! atomically on every mutation. The web wallet and CLI read the same
//! files; the formats here are the interchange contract.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keys::WalletRecord;
use crate::{atomic_write, Result, WalletError};

/// Persisted token entry (one element of the tokens JSON array).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Token id, hex.
    pub id: String,
    pub amount: u64,
    /// Spend secret, hex.
    pub secret_key_hex: String,
    /// Owning wallet name.
    pub wallet: String,
    pub created_ms: i64,
    pub spent: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spent_at_ms: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// The wallets file: named keypairs, at most one default.
pub struct WalletStore {
    path: PathBuf,
    wallets: Vec<WalletRecord>,
}

impl WalletStore {
    /// Load the store, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let wallets = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, wallets })
    }

    /// Add a wallet. The first wallet added becomes the default.
    pub fn add(&mut self, mut record: WalletRecord) -> Result<()> {
        if self.wallets.iter().any(|w| w.name == record.name) {
            return Err(WalletError::NameTaken(record.name));
        }
        if self.wallets.is_empty() {
            record.is_default = true;
        }
        self.wallets.push(record);
        self.save()
    }

    /// Look up a wallet by name.
    pub fn get(&self, name: &str) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| w.name == name)
    }

    /// The default wallet, when one exists.
    pub fn default_wallet(&self) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| w.is_default)
    }

    /// Move the default flag to the named wallet.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.wallets.iter().any(|w| w.name == name) {
            return Err(WalletError::NotFound(name.to_string()));
        }
        for wallet in &mut self.wallets {
            wallet.is_default = wallet.name == name;
        }
        self.save()
    }

    pub fn list(&self) -> &[WalletRecord] {
        &self.wallets
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_vec_pretty(&self.wallets)?;
        atomic_write(&self.path, &raw)?;
        debug!(path = %self.path.display(), count = self.wallets.len(), "wallet store saved");
        Ok(())
    }
}

/// The tokens file: every token this node holds or has spent.
pub struct TokenStore {
    path: PathBuf,
    tokens: Vec<TokenRecord>,
}

impl TokenStore {
    /// Load the store, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, tokens })
    }

    /// Record a newly held token.
    pub fn insert(&mut self, record: TokenRecord) -> Result<()> {
        self.tokens.push(record);
        self.save()
    }

    /// Mark a token spent; fails if unknown or already spent.
    pub fn mark_spent(&mut self, token_id: &str, spent_at_ms: i64) -> Result<()> {
        let token = self
            .tokens
            .iter_mut()
            .find(|t| t.id == token_id)
            .ok_or_else(|| WalletError::NotFound(token_id.to_string()))?;
        if token.spent {
            return Err(WalletError::AlreadySpent(token_id.to_string()));
        }
        token.spent = true;
        token.spent_at_ms = Some(spent_at_ms);
        self.save()
    }

    /// Unspent balance across one wallet, or all wallets when `None`.
    pub fn balance(&self, wallet: Option<&str>) -> u64 {
        self.tokens
            .iter()
            .filter(|t| !t.spent)
            .filter(|t| wallet.is_none_or(|w| t.wallet == w))
            .map(|t| t.amount)
            .sum()
    }

    /// Unspent tokens for a wallet.
    pub fn unspent(&self, wallet: &str) -> Vec<&TokenRecord> {
        self.tokens
            .iter()
            .filter(|t| !t.spent && t.wallet == wallet)
            .collect()
    }

    pub fn get(&self, token_id: &str) -> Option<&TokenRecord> {
        self.tokens.iter().find(|t| t.id == token_id)
    }

    pub fn list(&self) -> &[TokenRecord] {
        &self.tokens
    }

    fn save(&self) -> Result<()> {
        let raw = serde_json::to_vec_pretty(&self.tokens)?;
        atomic_write(&self.path, &raw)?;
        debug!(path = %self.path.display(), count = self.tokens.len(), "token store saved");
        Ok(())
    }
}

/// Persisted-file path helper used by tests and the harness.
pub fn store_paths(data_dir: &Path) -> (PathBuf, PathBuf) {
    (data_dir.join("wallets.json"), data_dir.join("tokens.json"))
}
