//! Ed25519 wallet keypairs.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{Result, WalletError};

/// Persisted wallet entry (one element of the wallets JSON array).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletRecord {
    pub name: String,
    pub public_key_hex: String,
    pub secret_key_hex: String,
    pub is_default: bool,
}

/// An in-memory wallet keypair.
pub struct WalletKeypair {
    signing_key: SigningKey,
}

impl WalletKeypair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Restore a keypair from a persisted record.
    pub fn from_record(record: &WalletRecord) -> Result<Self> {
        let raw = Zeroizing::new(
            hex::decode(&record.secret_key_hex)
                .map_err(|e| WalletError::InvalidKeyMaterial(e.to_string()))?,
        );
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidKeyMaterial("secret key must be 32 bytes".into()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    /// Persistable record for this keypair.
    pub fn to_record(&self, name: &str, is_default: bool) -> WalletRecord {
        WalletRecord {
            name: name.to_string(),
            public_key_hex: self.public_key_hex(),
            secret_key_hex: hex::encode(self.signing_key.to_bytes()),
            is_default,
        }
    }

    /// Hex-encoded public key (the recipient address handed to senders).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The spend secret used by the token engine for tokens held by this
    /// wallet: the raw signing-key seed.
    pub fn spend_secret(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Verify a signature against a hex public key.
    pub fn verify(public_key_hex: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
        let raw = hex::decode(public_key_hex)
            .map_err(|e| WalletError::InvalidKeyMaterial(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidKeyMaterial("public key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| WalletError::InvalidKeyMaterial(e.to_string()))?;
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|e| WalletError::InvalidKeyMaterial(e.to_string()))?;
        Ok(key.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_roundtrip_record() {
        let keypair = WalletKeypair::generate();
        let record = keypair.to_record("main", true);
        assert_eq!(record.public_key_hex.len(), 64);

        let restored = WalletKeypair::from_record(&record).expect("restore");
        assert_eq!(restored.public_key_hex(), keypair.public_key_hex());
    }

    #[test]
    fn test_sign_verify() {
        let keypair = WalletKeypair::generate();
        let signature = keypair.sign(b"payload");
        assert!(
            WalletKeypair::verify(&keypair.public_key_hex(), b"payload", &signature)
                .expect("verify")
        );
        assert!(
            !WalletKeypair::verify(&keypair.public_key_hex(), b"other", &signature)
                .expect("verify")
        );
    }

    #[test]
    fn test_bad_key_material_rejected() {
        let record = WalletRecord {
            name: "x".into(),
            public_key_hex: "zz".into(),
            secret_key_hex: "zz".into(),
            is_default: false,
        };
        assert!(WalletKeypair::from_record(&record).is_err());
    }
}
