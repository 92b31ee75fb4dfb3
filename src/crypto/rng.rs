//! CSPRNG access, centralized so nothing else in the crate touches `OsRng`
//! directly.

use rand::rngs::OsRng;
use rand::RngCore;

/// Draw `len` cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Draw a fixed-size array of cryptographically secure random bytes.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_draws_differ() {
        let a = random_bytes(32);
        let b = random_bytes(32);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn array_helper_fills_all_bytes() {
        let a: [u8; 12] = random_array();
        let b: [u8; 12] = random_array();
        assert_ne!(a, b);
    }
}
