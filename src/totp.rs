//! TOTP secret provisioning, code generation, and skew-window verification.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::clock::{Clock, SystemClock};
use crate::crypto::hmac_otp::{hotp, Algorithm};
use crate::crypto::{base32_decode, base32_encode, random_bytes};
use crate::error::{Error, Result};

const SECRET_LEN: usize = 32;

/// Immutable TOTP parameters, shared by every secret enrolled under them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TOTPConfig {
    /// Number of decimal digits in a generated code: 6 or 8.
    pub digits: u32,
    /// Seconds per time step.
    pub interval: u64,
    /// The HMAC algorithm.
    pub algorithm: Algorithm,
    /// Shown in the provisioning URI as the issuer/label.
    pub issuer: String,
    /// How many additional steps on each side of "now" are still accepted.
    pub valid_window: u32,
}

impl TOTPConfig {
    /// Build a config, rejecting a digit count outside `{6, 8}`.
    pub fn new(
        digits: u32,
        interval: u64,
        algorithm: Algorithm,
        issuer: impl Into<String>,
        valid_window: u32,
    ) -> Result<Self> {
        if digits != 6 && digits != 8 {
            return Err(Error::InvalidInput(format!(
                "digits must be 6 or 8, got {digits}"
            )));
        }
        Ok(Self {
            digits,
            interval,
            algorithm,
            issuer: issuer.into(),
            valid_window,
        })
    }
}

impl Default for TOTPConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            interval: 30,
            algorithm: Algorithm::Sha1,
            issuer: "vault-mfa".to_string(),
            valid_window: 1,
        }
    }
}

/// A raw 32-byte TOTP secret. Zeroized on drop.
#[derive(Clone)]
pub struct TOTPSecret(Vec<u8>);

impl TOTPSecret {
    /// Wrap raw bytes as a secret, without validating length — used when
    /// reconstructing from storage.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TOTPSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TOTPSecret").field(&"<redacted>").finish()
    }
}

/// Generates secrets, computes codes, and verifies them across a skew
/// window, for a fixed [`TOTPConfig`].
pub struct TOTPEngine {
    config: TOTPConfig,
    clock: Box<dyn Clock>,
}

impl TOTPEngine {
    /// Build an engine bound to `config`, using the real system clock.
    pub fn new(config: TOTPConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    /// Like [`TOTPEngine::new`] but with an injectable clock, for tests.
    pub fn with_clock(config: TOTPConfig, clock: Box<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// The config this engine was built with.
    pub fn config(&self) -> &TOTPConfig {
        &self.config
    }

    /// Draw a new 32-byte secret via the CSPRNG.
    pub fn generate_secret(&self) -> TOTPSecret {
        TOTPSecret(random_bytes(SECRET_LEN))
    }

    /// Encode a secret as unpadded uppercase RFC 4648 base32.
    pub fn format_secret(&self, secret: &TOTPSecret) -> String {
        base32_encode(secret.as_bytes())
    }

    /// Decode a base32-formatted secret back to raw bytes.
    pub fn parse_secret(&self, formatted: &str) -> Result<TOTPSecret> {
        Ok(TOTPSecret(base32_decode(formatted)?))
    }

    /// Build an `otpauth://totp/` provisioning URI for `account`.
    pub fn provisioning_uri(&self, account: &str, secret: &TOTPSecret) -> String {
        let b32 = self.format_secret(secret);
        let issuer = urlencode(&self.config.issuer);
        let account = urlencode(account);
        format!(
            "otpauth://totp/{issuer}:{account}?secret={b32}&issuer={issuer}&algorithm={alg}&digits={digits}&period={period}",
            alg = self.config.algorithm.uri_name(),
            digits = self.config.digits,
            period = self.config.interval,
        )
    }

    /// Compute the TOTP code for `secret` at `at_time` (POSIX seconds).
    pub fn generate_totp(&self, secret: &TOTPSecret, at_time: i64) -> String {
        let counter = (at_time as u64) / self.config.interval;
        hotp(secret.as_bytes(), counter, self.config.digits, self.config.algorithm)
    }

    /// Compute the TOTP code for `secret` at the current time.
    pub fn generate_totp_now(&self, secret: &TOTPSecret) -> String {
        self.generate_totp(secret, self.clock.now_unix())
    }

    /// Verify `code` against `secret` at `at_time`, accepting any step
    /// within `valid_window` steps of `at_time`. Malformed input (wrong
    /// length or non-digit characters) fails without performing any MAC
    /// computation.
    pub fn verify_totp(&self, secret: &TOTPSecret, code: &str, at_time: i64) -> bool {
        if !is_well_formed_code(code, self.config.digits) {
            return false;
        }

        let window = self.config.valid_window as i64;
        let interval = self.config.interval as i64;
        let mut accepted = false;
        for k in -window..=window {
            let candidate_time = at_time + k * interval;
            if candidate_time < 0 {
                continue;
            }
            let expected = self.generate_totp(secret, candidate_time);
            if constant_time_str_eq(&expected, code) {
                accepted = true;
            }
        }
        accepted
    }

    /// Verify `code` against `secret` at the current time.
    pub fn verify_totp_now(&self, secret: &TOTPSecret, code: &str) -> bool {
        self.verify_totp(secret, code, self.clock.now_unix())
    }
}

fn is_well_formed_code(code: &str, digits: u32) -> bool {
    code.len() == digits as usize && code.chars().all(|c| c.is_ascii_digit())
}

fn constant_time_str_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

impl Drop for TOTPSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn rfc6238_engine(valid_window: u32) -> TOTPEngine {
        let config = TOTPConfig::new(6, 30, Algorithm::Sha1, "TestIssuer", valid_window).unwrap();
        TOTPEngine::new(config)
    }

    fn rfc6238_secret() -> TOTPSecret {
        // The RFC 4226/6238 SHA1 test secret: ASCII "12345678901234567890".
        TOTPSecret::from_bytes(b"12345678901234567890".to_vec())
    }

    #[test]
    fn generate_secret_is_32_bytes_and_random() {
        let engine = rfc6238_engine(1);
        let a = engine.generate_secret();
        let b = engine.generate_secret();
        assert_eq!(a.as_bytes().len(), SECRET_LEN);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn format_secret_round_trips() {
        let engine = rfc6238_engine(1);
        let secret = engine.generate_secret();
        let formatted = engine.format_secret(&secret);
        assert!(formatted.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(!formatted.contains('='));
        let parsed = engine.parse_secret(&formatted).unwrap();
        assert_eq!(parsed.as_bytes(), secret.as_bytes());
    }

    #[test]
    fn provisioning_uri_has_required_fields() {
        let engine = rfc6238_engine(1);
        let secret = engine.generate_secret();
        let uri = engine.provisioning_uri("alice", &secret);
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("TestIssuer:alice"));
        assert!(uri.contains("issuer=TestIssuer"));
        assert!(uri.contains("algorithm=SHA1"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("period=30"));
    }

    #[test]
    fn rfc6238_sha1_vector_at_t59() {
        let engine = rfc6238_engine(1);
        let secret = rfc6238_secret();
        assert_eq!(engine.generate_totp(&secret, 59), "287082");
    }

    #[test]
    fn verify_accepts_within_window_and_rejects_beyond() {
        let engine = rfc6238_engine(1);
        let secret = rfc6238_secret();
        assert!(engine.verify_totp(&secret, "287082", 59));
        assert!(!engine.verify_totp(&secret, "287082", 119));
    }

    #[test]
    fn verify_rejects_malformed_codes_without_computing_hmac() {
        let engine = rfc6238_engine(1);
        let secret = rfc6238_secret();
        assert!(!engine.verify_totp(&secret, "12a456", 59));
        assert!(!engine.verify_totp(&secret, "12345", 59));
        assert!(!engine.verify_totp(&secret, "0000000", 59));
    }

    #[test]
    fn generate_totp_now_uses_injected_clock() {
        let config = TOTPConfig::new(6, 30, Algorithm::Sha1, "TestIssuer", 1).unwrap();
        let engine = TOTPEngine::with_clock(config, Box::new(FixedClock(59)));
        let secret = rfc6238_secret();
        assert_eq!(engine.generate_totp_now(&secret), "287082");
    }

    #[test]
    fn digits_must_be_six_or_eight() {
        assert!(TOTPConfig::new(7, 30, Algorithm::Sha1, "X", 1).is_err());
        assert!(TOTPConfig::new(8, 30, Algorithm::Sha1, "X", 1).is_ok());
    }

    #[test]
    fn debug_impl_redacts_secret() {
        let secret = TOTPSecret::from_bytes(vec![1, 2, 3]);
        assert_eq!(format!("{secret:?}"), "TOTPSecret(\"<redacted>\")");
    }
}
