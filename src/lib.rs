//! # vault-mfa
//!
//! TOTP-based multi-factor authentication and symmetric key management.
//!
//! ## Features
//!
//! - **TOTP**: RFC 6238 time-based one-time codes with configurable digits,
//!   interval, algorithm, and skew window.
//! - **Recovery codes**: single-use backup codes, salted and hashed at rest.
//! - **Key management**: a master-key-wrapped keystore with generation,
//!   rotation, and deletion of symmetric data keys.
//!
//! ## Quick start
//!
//! ```rust
//! use vault_mfa::{MFAService, TOTPConfig};
//!
//! let config = TOTPConfig::default();
//! let service = MFAService::new(config, 10);
//! let enrollment = service.setup_mfa_for_user("user@example.com").unwrap();
//! assert_eq!(enrollment.backup_codes.len(), 10);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

/// Injectable time source, used by the TOTP engine and the key manager so
/// both can be tested without sleeping.
pub mod clock;

/// Low-level cryptographic primitives: RNG, AEAD wrapping, KDF, encoding,
/// and HOTP/TOTP computation.
pub mod crypto;

/// Error and result types for the library.
pub mod error;

/// The master key vault used to wrap per-purpose data keys at rest.
pub mod master_key;

/// On-disk representation of the key store.
pub mod keystore;

/// Lifecycle management for symmetric data keys: generation, retrieval,
/// rotation, and deletion.
pub mod key_manager;

/// TOTP secret provisioning, code generation, and verification.
pub mod totp;

/// Single-use recovery code generation, hashing, and verification.
pub mod recovery;

/// Orchestrates TOTP and recovery-code enrollment and verification.
pub mod mfa;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::error::{Error, Result};
pub use crate::key_manager::{KeyManager, KeySummary, RotationConfig, RotationPolicy};
pub use crate::master_key::MasterKeyVault;
pub use crate::mfa::{MFAEnrollment, MFAService};
pub use crate::recovery::{HashedRecoveryCode, RecoveryCodeEngine};
pub use crate::totp::{TOTPConfig, TOTPEngine, TOTPSecret};
