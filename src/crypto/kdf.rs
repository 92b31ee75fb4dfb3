//! Password-hash KDF used to make recovery codes expensive to brute-force.
//!
//! Recovery codes are low-entropy by design (8 hex characters), so the KDF
//! parameters favor being meaningfully slower than a bare hash while still
//! being tolerable on a verify-on-every-login path.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{Error, Result};

const OUTPUT_LEN: usize = 32;
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

fn argon2() -> Argon2<'static> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .expect("fixed argon2 parameters are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash `input` (recovery-code plaintext, already normalized by the caller)
/// against `salt`, producing a fixed 32-byte output.
pub fn hash_password(input: &[u8], salt: &[u8]) -> Result<[u8; OUTPUT_LEN]> {
    let mut out = [0u8; OUTPUT_LEN];
    argon2()
        .hash_password_into(input, salt, &mut out)
        .map_err(|e| Error::Integrity(format!("KDF failure: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_and_salt_produce_same_output() {
        let salt = b"0123456789abcdef";
        let a = hash_password(b"abcd-1234", salt).unwrap();
        let b = hash_password(b"abcd-1234", salt).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salt_changes_output() {
        let a = hash_password(b"abcd-1234", b"0123456789abcdef").unwrap();
        let b = hash_password(b"abcd-1234", b"fedcba9876543210").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn output_is_fixed_length() {
        let out = hash_password(b"x", b"0123456789abcdef").unwrap();
        assert_eq!(out.len(), OUTPUT_LEN);
    }
}
