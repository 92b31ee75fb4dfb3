//! Single-use recovery codes: generation, salted hashing, and constant-time
//! verification.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::crypto::{base64_decode, base64_encode, hash_password, random_bytes};
use crate::error::Result;

const SALT_LEN: usize = 16;
const GROUP_LEN: usize = 4;

/// A hashed, storable recovery-code entry. `used` flips false to true
/// exactly once, on first successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedRecoveryCode {
    /// Base64 of the 16-byte salt drawn for this code.
    pub salt: String,
    /// Base64 of the 32-byte KDF output.
    pub hash: String,
    /// Whether this code has already been consumed.
    pub used: bool,
}

/// Generates, hashes, and verifies recovery codes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveryCodeEngine;

impl RecoveryCodeEngine {
    /// Produce `n` distinct `XXXX-XXXX` codes.
    pub fn generate(&self, n: usize) -> Vec<String> {
        let mut codes = Vec::with_capacity(n);
        while codes.len() < n {
            let candidate = generate_one();
            if !codes.contains(&candidate) {
                codes.push(candidate);
            }
        }
        codes
    }

    /// Hash every code in `codes`, preserving order, each with a fresh salt.
    pub fn hash_all(&self, codes: &[String]) -> Result<Vec<HashedRecoveryCode>> {
        codes
            .iter()
            .map(|code| {
                let salt = random_bytes(SALT_LEN);
                let hash = hash_password(normalize(code).as_bytes(), &salt)?;
                Ok(HashedRecoveryCode {
                    salt: base64_encode(&salt),
                    hash: base64_encode(&hash),
                    used: false,
                })
            })
            .collect()
    }

    /// Check `code` against `hashed_list` in order, considering only
    /// unused entries. On the first match, returns `(true, updated_list)`
    /// with that entry marked used. Never mutates `hashed_list` in place.
    pub fn verify(
        &self,
        code: &str,
        hashed_list: &[HashedRecoveryCode],
    ) -> Result<(bool, Vec<HashedRecoveryCode>)> {
        let normalized = normalize(code);
        let mut updated = hashed_list.to_vec();

        for entry in updated.iter_mut() {
            if entry.used {
                continue;
            }
            let salt = base64_decode(&entry.salt)?;
            let stored_hash = base64_decode(&entry.hash)?;
            let candidate_hash = hash_password(normalized.as_bytes(), &salt)?;

            if constant_time_eq(&candidate_hash, &stored_hash) {
                entry.used = true;
                return Ok((true, updated));
            }
        }

        Ok((false, hashed_list.to_vec()))
    }
}

fn generate_one() -> String {
    let bytes = random_bytes(GROUP_LEN);
    let mut hex = String::with_capacity(GROUP_LEN * 2);
    for b in bytes {
        hex.push_str(&format!("{b:02x}"));
    }
    format!("{}-{}", &hex[..GROUP_LEN], &hex[GROUP_LEN..])
}

fn normalize(code: &str) -> String {
    code.trim().to_lowercase()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_returns_distinct_well_formed_codes() {
        let engine = RecoveryCodeEngine;
        let codes = engine.generate(10);
        assert_eq!(codes.len(), 10);
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 9);
            assert_eq!(code.as_bytes()[4], b'-');
            assert!(code.chars().all(|c| c == '-' || c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn hash_all_preserves_order_and_sets_unused() {
        let engine = RecoveryCodeEngine;
        let codes = engine.generate(3);
        let hashed = engine.hash_all(&codes).unwrap();
        assert_eq!(hashed.len(), 3);
        assert!(hashed.iter().all(|h| !h.used));
    }

    #[test]
    fn verify_succeeds_once_then_fails_on_reuse() {
        let engine = RecoveryCodeEngine;
        let codes = engine.generate(5);
        let hashed = engine.hash_all(&codes).unwrap();

        let (ok, updated) = engine.verify(&codes[0], &hashed).unwrap();
        assert!(ok);
        assert!(updated[0].used);

        let (ok_again, updated_again) = engine.verify(&codes[0], &updated).unwrap();
        assert!(!ok_again);
        assert_eq!(updated_again, updated);
    }

    #[test]
    fn verify_rejects_unknown_code() {
        let engine = RecoveryCodeEngine;
        let codes = engine.generate(2);
        let hashed = engine.hash_all(&codes).unwrap();

        let (ok, updated) = engine.verify("0000-0000", &hashed).unwrap();
        assert!(!ok);
        assert_eq!(updated, hashed);
    }

    #[test]
    fn verify_normalizes_case_and_whitespace() {
        let engine = RecoveryCodeEngine;
        let codes = engine.generate(1);
        let hashed = engine.hash_all(&codes).unwrap();

        let shouted = format!("  {}  ", codes[0].to_uppercase());
        let (ok, _) = engine.verify(&shouted, &hashed).unwrap();
        assert!(ok);
    }
}
