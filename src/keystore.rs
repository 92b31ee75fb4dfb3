//! The on-disk keystore document: one active data key plus any number of
//! retired keys, each wrapped under the master key.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A single stored data key and its metadata. `key` holds the wrapped
/// (`nonce || ciphertext || tag`) bytes, base64-encoded for JSON transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Base64 of the wrapped key bytes.
    pub key: String,
    /// Always `"data"` for the keys this crate manages.
    #[serde(rename = "type")]
    pub key_type: String,
    /// When this key was created.
    pub created_at: DateTime<Utc>,
    /// Number of times [`crate::key_manager::KeyManager::get_key`] has
    /// returned this key's raw bytes.
    pub use_count: u64,
    /// Whether this key has been superseded by a rotation. Flips false to
    /// true exactly once.
    pub rotated: bool,
}

impl KeyRecord {
    pub(crate) fn new(wrapped_key_b64: String, created_at: DateTime<Utc>) -> Self {
        Self {
            key: wrapped_key_b64,
            key_type: "data".to_string(),
            created_at,
            use_count: 0,
            rotated: false,
        }
    }
}

/// The full durable document at `key_store_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreFile {
    /// The key currently selected for new encryption operations.
    pub active_key_id: Uuid,
    /// Every key this store knows about, keyed by id.
    pub keys: HashMap<Uuid, KeyRecord>,
}

impl KeyStoreFile {
    /// Check the invariants in the data model: the active key exists, is
    /// not itself rotated, and the store is non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(Error::Integrity("keystore has no keys".into()));
        }
        let active = self.keys.get(&self.active_key_id).ok_or_else(|| {
            Error::Integrity(format!(
                "active_key_id {} is not present in keys",
                self.active_key_id
            ))
        })?;
        if active.rotated {
            return Err(Error::Integrity(format!(
                "active key {} is marked rotated",
                self.active_key_id
            )));
        }
        let non_rotated_count = self.keys.values().filter(|k| !k.rotated).count();
        if non_rotated_count != 1 {
            return Err(Error::Integrity(format!(
                "expected exactly one non-rotated key, found {non_rotated_count}"
            )));
        }
        Ok(())
    }

    /// Read and parse the keystore document at `path`. Returns `None` if
    /// the file does not exist so the caller can bootstrap.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let parsed: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::Integrity(format!("corrupt keystore JSON: {e}")))?;
        parsed.validate()?;
        Ok(Some(parsed))
    }

    /// Persist this document to `path` atomically: serialize to a sibling
    /// temp file, then rename over the destination.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = Self::sibling_temp_path(path);
        fs::write(&temp_path, serialized)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn sibling_temp_path(path: &Path) -> std::path::PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keystore".to_string());
        path.with_file_name(format!(".{file_name}.tmp"))
    }
}
