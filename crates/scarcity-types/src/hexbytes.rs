//! Serde helpers for 32-byte fields carried as lowercase hex strings.
//!
//! The relay and transfer wire formats are JSON; every 32-byte value
//! (nullifier, commitment, hash) crosses the wire hex-encoded.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a `[u8; 32]` as a lowercase hex string.
pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// Deserialize a `[u8; 32]` from a hex string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
    raw.try_into()
        .map_err(|_| serde::de::Error::custom("expected 32 hex-encoded bytes"))
}

/// Same as the parent module, for `Option<[u8; 32]>` fields.
pub mod opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            None => Ok(None),
            Some(s) => {
                let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = raw
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 hex-encoded bytes"))?;
                Ok(Some(arr))
            }
        }
    }
}
