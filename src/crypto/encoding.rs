//! Base32 and Base64 codecs at the crate's external boundaries.
//!
//! Base32 carries TOTP secrets (uppercase, unpadded output, padding-tolerant
//! input). Base64 carries everything else that needs to travel as text:
//! wrapped keys, recovery-code salts/hashes.

use base32::Alphabet;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

const BASE32_ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Encode bytes as unpadded, uppercase RFC 4648 base32.
pub fn base32_encode(bytes: &[u8]) -> String {
    base32::encode(BASE32_ALPHABET, bytes)
}

/// Decode an RFC 4648 base32 string, tolerating both padded and unpadded
/// input and either letter case.
pub fn base32_decode(encoded: &str) -> Result<Vec<u8>> {
    let normalized = encoded.trim_end_matches('=').to_uppercase();
    base32::decode(BASE32_ALPHABET, &normalized)
        .ok_or_else(|| Error::InvalidInput(format!("not valid base32: {encoded}")))
}

/// Encode bytes as standard, padded base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a standard, padded base64 string.
pub fn base64_decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidInput(format!("not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base32_round_trips() {
        let secret = b"abcdefghijklmnopqrstuvwxyz123456";
        let encoded = base32_encode(secret);
        assert!(encoded.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(!encoded.contains('='));
        assert_eq!(base32_decode(&encoded).unwrap(), secret);
    }

    #[test]
    fn base32_decode_tolerates_padding_and_case() {
        let secret = b"hello world! 12345";
        let encoded = base32_encode(secret);
        let padded_lower = format!("{}{}", encoded.to_lowercase(), "=".repeat(4));
        assert_eq!(base32_decode(&padded_lower).unwrap(), secret);
    }

    #[test]
    fn base64_round_trips() {
        let data = b"wrapped key material";
        let encoded = base64_encode(data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn base64_rejects_garbage() {
        assert!(base64_decode("not valid base64!!").is_err());
    }
}
