//! Orchestrates enrollment and combined TOTP/recovery-code verification.

use serde::{Deserialize, Serialize};

use crate::crypto::base64_decode;
use crate::error::Result;
use crate::master_key::MasterKeyVault;
use crate::recovery::{HashedRecoveryCode, RecoveryCodeEngine};
use crate::totp::{TOTPConfig, TOTPEngine, TOTPSecret};

/// The record returned at enrollment time. Carries plaintext secret
/// material that must not outlive enrollment or reach logs; its `Debug`
/// impl redacts both `secret` and `backup_codes`.
#[derive(Clone, Serialize, Deserialize)]
pub struct MFAEnrollment {
    /// Always `"totp"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Base64 of the raw TOTP secret.
    pub secret: String,
    /// RFC 4648 base32 rendering of the same secret.
    pub formatted_secret: String,
    /// Plaintext recovery codes, shown to the user exactly once.
    pub backup_codes: Vec<String>,
    /// Hashed recovery codes, the only form that should reach storage.
    pub hashed_backup_codes: Vec<HashedRecoveryCode>,
    /// The `otpauth://` provisioning URI.
    pub uri: String,
    /// The TOTP parameters this enrollment was created under.
    pub config: TOTPConfig,
}

impl std::fmt::Debug for MFAEnrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MFAEnrollment")
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .field("formatted_secret", &"<redacted>")
            .field("backup_codes", &"<redacted>")
            .field("hashed_backup_codes", &self.hashed_backup_codes)
            .field("uri", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}

/// Orchestrates TOTP + recovery-code enrollment and verification. Holds no
/// state of its own beyond its configuration; every operation is pure in
/// its record arguments.
pub struct MFAService<'a> {
    totp_engine: TOTPEngine,
    recovery_engine: RecoveryCodeEngine,
    backup_code_count: usize,
    master_key: Option<&'a MasterKeyVault>,
}

impl<'a> MFAService<'a> {
    /// Build a service for the given TOTP config and backup-code count,
    /// with no master-key wrapping support.
    pub fn new(totp_config: TOTPConfig, backup_code_count: usize) -> Self {
        Self {
            totp_engine: TOTPEngine::new(totp_config),
            recovery_engine: RecoveryCodeEngine,
            backup_code_count,
            master_key: None,
        }
    }

    /// Like [`MFAService::new`], but with a master key available to wrap
    /// the TOTP secret for callers who want to persist it (see
    /// [`MFAService::wrap_secret_for_persistence`]).
    pub fn with_master_key(
        totp_config: TOTPConfig,
        backup_code_count: usize,
        master_key: &'a MasterKeyVault,
    ) -> Self {
        Self {
            totp_engine: TOTPEngine::new(totp_config),
            recovery_engine: RecoveryCodeEngine,
            backup_code_count,
            master_key: Some(master_key),
        }
    }

    /// Enroll `account` in TOTP MFA: a new secret, its formatted form, a
    /// provisioning URI, and a fresh batch of recovery codes (plaintext and
    /// hashed). The caller is responsible for persisting only the
    /// non-secret fields.
    pub fn setup_mfa_for_user(&self, account: &str) -> Result<MFAEnrollment> {
        let secret = self.totp_engine.generate_secret();
        let formatted_secret = self.totp_engine.format_secret(&secret);
        let uri = self.totp_engine.provisioning_uri(account, &secret);

        let backup_codes = self.recovery_engine.generate(self.backup_code_count);
        let hashed_backup_codes = self.recovery_engine.hash_all(&backup_codes)?;

        Ok(MFAEnrollment {
            kind: "totp".to_string(),
            secret: crate::crypto::base64_encode(secret.as_bytes()),
            formatted_secret,
            backup_codes,
            hashed_backup_codes,
            uri,
            config: *self.totp_engine.config(),
        })
    }

    /// If this service was built [`with_master_key`](Self::with_master_key),
    /// wrap `enrollment`'s raw secret under the master key for callers that
    /// want to persist the secret rather than discard it. Returns `None`
    /// when no master key is configured.
    pub fn wrap_secret_for_persistence(&self, enrollment: &MFAEnrollment) -> Result<Option<Vec<u8>>> {
        match self.master_key {
            None => Ok(None),
            Some(vault) => {
                let raw = base64_decode(&enrollment.secret)?;
                Ok(Some(vault.wrap(&raw)))
            }
        }
    }

    /// Verify `submitted_code` against `enrollment`, dispatching between
    /// TOTP and recovery-code verification by the shape of the input.
    /// Returns `(true, None)` on a TOTP match, `(true, Some(updated))` on a
    /// recovery-code match (with that code marked used), or `(false,
    /// None)` otherwise. Never mutates `enrollment` itself.
    pub fn verify_mfa(
        &self,
        enrollment: &MFAEnrollment,
        submitted_code: &str,
    ) -> Result<(bool, Option<MFAEnrollment>)> {
        let trimmed = submitted_code.trim();
        let looks_like_totp =
            trimmed.len() == enrollment.config.digits as usize && trimmed.chars().all(|c| c.is_ascii_digit());

        if looks_like_totp {
            let secret_bytes = base64_decode(&enrollment.secret)?;
            let secret = TOTPSecret::from_bytes(secret_bytes);
            if self.totp_engine.verify_totp_now(&secret, trimmed) {
                return Ok((true, None));
            }
        }

        let (matched, updated_codes) = self
            .recovery_engine
            .verify(submitted_code, &enrollment.hashed_backup_codes)?;
        if matched {
            let mut updated = enrollment.clone();
            updated.hashed_backup_codes = updated_codes;
            Ok((true, Some(updated)))
        } else {
            Ok((false, None))
        }
    }
}
