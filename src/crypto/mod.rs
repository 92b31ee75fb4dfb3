//! Cryptographic primitives shared by the MFA and key-management engines.
//!
//! Nothing here is exposed as a trait object or made swappable at runtime:
//! the choice of hash, AEAD, and KDF is fixed, per the data model. The
//! module boundary exists so the rest of the crate never reaches for a
//! crypto crate directly.

pub mod aead;
pub mod encoding;
pub mod hmac_otp;
pub mod kdf;
pub mod rng;

pub use aead::{unwrap_bytes, wrap_bytes};
pub use encoding::{base32_decode, base32_encode, base64_decode, base64_encode};
pub use kdf::hash_password;
pub use rng::random_bytes;
