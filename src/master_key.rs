//! The master key: a single long-lived secret that wraps every data key in
//! the keystore. Stored as 32 raw bytes with restrictive file permissions.

use std::fs;
use std::path::Path;

use zeroize::Zeroize;

use crate::crypto::{random_bytes, unwrap_bytes, wrap_bytes};
use crate::error::{Error, Result};

const MASTER_KEY_LEN: usize = 32;

/// Loads or creates the master key file and wraps/unwraps arbitrary byte
/// strings under it.
pub struct MasterKeyVault {
    key: [u8; MASTER_KEY_LEN],
}

impl MasterKeyVault {
    /// Read the master key from `path`, creating it via the CSPRNG if the
    /// file does not exist. The file is written with mode `0600` where the
    /// platform supports POSIX permissions; failure to set that mode is
    /// logged but not fatal.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let bytes = fs::read(path)?;
            if bytes.len() != MASTER_KEY_LEN {
                return Err(Error::Integrity(format!(
                    "master key file at {} is {} bytes, expected {MASTER_KEY_LEN}",
                    path.display(),
                    bytes.len()
                )));
            }
            let mut key = [0u8; MASTER_KEY_LEN];
            key.copy_from_slice(&bytes);
            tracing::debug!(path = %path.display(), "loaded existing master key");
            Ok(Self { key })
        } else {
            let mut key = [0u8; MASTER_KEY_LEN];
            let drawn = random_bytes(MASTER_KEY_LEN);
            key.copy_from_slice(&drawn);

            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, key)?;
            Self::restrict_permissions(path);
            tracing::debug!(path = %path.display(), "created new master key");
            Ok(Self { key })
        }
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            tracing::warn!(path = %path.display(), error = %e, "failed to restrict master key file permissions");
        }
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &Path) {}

    /// AEAD-encrypt `plaintext` under the master key with a fresh nonce.
    pub fn wrap(&self, plaintext: &[u8]) -> Vec<u8> {
        wrap_bytes(&self.key, plaintext)
    }

    /// Decrypt and verify a blob produced by [`MasterKeyVault::wrap`].
    pub fn unwrap(&self, wrapped: &[u8]) -> Result<Vec<u8>> {
        unwrap_bytes(&self.key, wrapped)
    }
}

impl Drop for MasterKeyVault {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_file_on_first_use() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        assert!(!path.exists());

        let vault = MasterKeyVault::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), MASTER_KEY_LEN as u64);
        drop(vault);
    }

    #[test]
    fn reloading_yields_the_same_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");

        let vault1 = MasterKeyVault::load_or_create(&path).unwrap();
        let wrapped = vault1.wrap(b"some data key");
        drop(vault1);

        let vault2 = MasterKeyVault::load_or_create(&path).unwrap();
        assert_eq!(vault2.unwrap(&wrapped).unwrap(), b"some data key");
    }

    #[cfg(unix)]
    #[test]
    fn file_permissions_are_restrictive() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        let _vault = MasterKeyVault::load_or_create(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn wrap_unwrap_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        let vault = MasterKeyVault::load_or_create(&path).unwrap();

        let wrapped = vault.wrap(b"thirty-two bytes of data key!!!");
        assert_eq!(vault.unwrap(&wrapped).unwrap(), b"thirty-two bytes of data key!!!");
    }

    #[test]
    fn tampered_wrapped_key_fails_integrity_check() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.key");
        let vault = MasterKeyVault::load_or_create(&path).unwrap();

        let mut wrapped = vault.wrap(b"data key bytes");
        let last = wrapped.len() - 1;
        wrapped[last] ^= 1;
        assert!(matches!(vault.unwrap(&wrapped), Err(Error::Integrity(_))));
    }
}
