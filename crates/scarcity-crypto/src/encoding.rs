//! Hex codec helpers.

use crate::{CryptoError, Result};

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string into bytes.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

/// Decode a hex string into exactly 32 bytes.
pub fn from_hex32(s: &str) -> Result<[u8; 32]> {
    let raw = from_hex(s)?;
    let len = raw.len();
    raw.try_into().map_err(|_| CryptoError::InvalidLength {
        expected: 32,
        actual: len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(to_hex(&bytes), "deadbeef");
        assert_eq!(from_hex("deadbeef").expect("decode"), bytes);
    }

    #[test]
    fn test_from_hex32_length_check() {
        assert!(from_hex32(&"ab".repeat(32)).is_ok());
        assert!(matches!(
            from_hex32("abcd"),
            Err(CryptoError::InvalidLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(matches!(from_hex("zz"), Err(CryptoError::InvalidHex(_))));
    }
}
