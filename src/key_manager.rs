//! Key lifecycle management: issue, fetch, list, rotate, and delete data
//! keys, and evaluate whether rotation is due.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::crypto::{base64_decode, base64_encode, random_bytes};
use crate::error::{Error, Result};
use crate::keystore::{KeyRecord, KeyStoreFile};
use crate::master_key::MasterKeyVault;

const DATA_KEY_LEN: usize = 32;

/// Which conditions, if any, mark the active key as due for rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationPolicy {
    /// Never due for rotation.
    None,
    /// Due once the active key's age exceeds `max_age_days`.
    TimeBased,
    /// Due once the active key's use count reaches `max_uses`.
    UsageBased,
    /// Due under either of the above.
    Combined,
}

/// Declares how [`KeyManager::check_rotation_needed`] should evaluate the
/// active key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Which policy to apply.
    pub policy: RotationPolicy,
    /// Required for `TimeBased` and `Combined`.
    pub max_age_days: Option<u32>,
    /// Required for `UsageBased` and `Combined`.
    pub max_uses: Option<u64>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            policy: RotationPolicy::None,
            max_age_days: None,
            max_uses: None,
        }
    }
}

impl RotationConfig {
    fn validate(&self) -> Result<()> {
        match self.policy {
            RotationPolicy::None => Ok(()),
            RotationPolicy::TimeBased => {
                if self.max_age_days.is_none() {
                    return Err(Error::Configuration(
                        "TIME_BASED rotation policy requires max_age_days".into(),
                    ));
                }
                Ok(())
            }
            RotationPolicy::UsageBased => {
                if self.max_uses.is_none() {
                    return Err(Error::Configuration(
                        "USAGE_BASED rotation policy requires max_uses".into(),
                    ));
                }
                Ok(())
            }
            RotationPolicy::Combined => {
                if self.max_age_days.is_none() || self.max_uses.is_none() {
                    return Err(Error::Configuration(
                        "COMBINED rotation policy requires both max_age_days and max_uses".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// A listing entry for [`KeyManager::list_keys`]. Deliberately omits the
/// wrapped key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySummary {
    /// The key's id.
    pub id: Uuid,
    /// Always `"data"`.
    #[serde(rename = "type")]
    pub key_type: String,
    /// When the key was created.
    pub created_at: chrono::DateTime<Utc>,
    /// How many times the raw key bytes have been fetched.
    pub use_count: u64,
    /// Whether the key has been rotated out.
    pub rotated: bool,
    /// Whether this is the currently active key.
    pub is_active: bool,
}

/// Owns the keystore document and the master key, and serializes every
/// mutating operation under a single exclusive lock.
pub struct KeyManager {
    key_store_path: PathBuf,
    master_key: MasterKeyVault,
    rotation_config: RotationConfig,
    clock: Box<dyn Clock>,
    state: RwLock<KeyStoreFile>,
}

impl KeyManager {
    /// Open (or bootstrap) a key manager backed by `key_store_path` and
    /// `master_key_path`, using the real system clock.
    pub fn new(
        key_store_path: impl AsRef<Path>,
        master_key_path: impl AsRef<Path>,
        rotation_config: RotationConfig,
    ) -> Result<Self> {
        Self::with_clock(
            key_store_path,
            master_key_path,
            rotation_config,
            Box::new(SystemClock),
        )
    }

    /// Like [`KeyManager::new`] but with an injectable clock, for tests.
    pub fn with_clock(
        key_store_path: impl AsRef<Path>,
        master_key_path: impl AsRef<Path>,
        rotation_config: RotationConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        rotation_config.validate()?;

        let key_store_path = key_store_path.as_ref().to_path_buf();
        let master_key = MasterKeyVault::load_or_create(master_key_path.as_ref())?;

        let store = match KeyStoreFile::load(&key_store_path)? {
            Some(store) => store,
            None => {
                let now = chrono_now(clock.as_ref());
                let (id, record) = new_key_record(&master_key, now);
                let mut keys = std::collections::HashMap::new();
                keys.insert(id, record);
                let bootstrap = KeyStoreFile {
                    active_key_id: id,
                    keys,
                };
                bootstrap.persist(&key_store_path)?;
                tracing::info!(key_id = %id, "bootstrapped keystore with initial active key");
                bootstrap
            }
        };

        Ok(Self {
            key_store_path,
            master_key,
            rotation_config,
            clock,
            state: RwLock::new(store),
        })
    }

    /// Generate a new data key, wrapped under the master key. Does not
    /// change which key is active.
    pub fn generate_key(&self) -> Result<Uuid> {
        let mut guard = self.state.write().expect("keystore lock poisoned");
        let now = chrono_now(self.clock.as_ref());
        let (id, record) = new_key_record(&self.master_key, now);
        guard.keys.insert(id, record);
        guard.persist(&self.key_store_path)?;
        tracing::debug!(key_id = %id, "generated new data key");
        Ok(id)
    }

    /// Fetch a key's raw bytes, incrementing its use count. Defaults to the
    /// active key when `id` is `None`.
    pub fn get_key(&self, id: Option<Uuid>) -> Result<(Uuid, Vec<u8>)> {
        let mut guard = self.state.write().expect("keystore lock poisoned");
        let key_id = id.unwrap_or(guard.active_key_id);

        let wrapped = {
            let record = guard
                .keys
                .get(&key_id)
                .ok_or_else(|| Error::NotFound(key_id.to_string()))?;
            base64_decode(&record.key)?
        };
        let raw = self.master_key.unwrap(&wrapped)?;

        let record = guard
            .keys
            .get_mut(&key_id)
            .expect("key presence already checked above");
        record.use_count += 1;
        guard.persist(&self.key_store_path)?;

        Ok((key_id, raw))
    }

    /// List every stored key's metadata. Never includes wrapped key
    /// material.
    pub fn list_keys(&self) -> Vec<KeySummary> {
        let guard = self.state.read().expect("keystore lock poisoned");
        let active_id = guard.active_key_id;
        let mut summaries: Vec<KeySummary> = guard
            .keys
            .iter()
            .map(|(id, record)| KeySummary {
                id: *id,
                key_type: record.key_type.clone(),
                created_at: record.created_at,
                use_count: record.use_count,
                rotated: record.rotated,
                is_active: *id == active_id,
            })
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Mint a new active key and retire the current one. Rotation is
    /// prospective only: no existing ciphertext is re-encrypted.
    pub fn rotate_key(&self) -> Result<Uuid> {
        let mut guard = self.state.write().expect("keystore lock poisoned");
        let now = chrono_now(self.clock.as_ref());
        let (new_id, record) = new_key_record(&self.master_key, now);

        let old_active = guard.active_key_id;
        if let Some(old_record) = guard.keys.get_mut(&old_active) {
            old_record.rotated = true;
        }
        guard.keys.insert(new_id, record);
        guard.active_key_id = new_id;
        guard.persist(&self.key_store_path)?;

        tracing::info!(old_key_id = %old_active, new_key_id = %new_id, "rotated active key");
        Ok(new_id)
    }

    /// Delete a non-active key. Refuses (returning `false`, making no
    /// changes) if `id` is the active key.
    pub fn delete_key(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.state.write().expect("keystore lock poisoned");
        if id == guard.active_key_id {
            return Ok(false);
        }
        let removed = guard.keys.remove(&id).is_some();
        if removed {
            guard.persist(&self.key_store_path)?;
            tracing::debug!(key_id = %id, "deleted retired key");
        }
        Ok(removed)
    }

    /// Evaluate the active key against the configured rotation policy.
    pub fn check_rotation_needed(&self) -> bool {
        let guard = self.state.read().expect("keystore lock poisoned");
        let active = match guard.keys.get(&guard.active_key_id) {
            Some(active) => active,
            None => return false,
        };

        let time_based_due = || {
            let max_age = self.rotation_config.max_age_days.unwrap_or(u32::MAX);
            let now = chrono_now(self.clock.as_ref());
            now.signed_duration_since(active.created_at) >= Duration::days(max_age as i64)
        };
        let usage_based_due = || active.use_count >= self.rotation_config.max_uses.unwrap_or(u64::MAX);

        match self.rotation_config.policy {
            RotationPolicy::None => false,
            RotationPolicy::TimeBased => time_based_due(),
            RotationPolicy::UsageBased => usage_based_due(),
            RotationPolicy::Combined => time_based_due() || usage_based_due(),
        }
    }
}

fn chrono_now(clock: &dyn Clock) -> chrono::DateTime<Utc> {
    chrono::DateTime::from_timestamp(clock.now_unix(), 0).unwrap_or_else(Utc::now)
}

fn new_key_record(master_key: &MasterKeyVault, now: chrono::DateTime<Utc>) -> (Uuid, KeyRecord) {
    let raw = random_bytes(DATA_KEY_LEN);
    let wrapped = master_key.wrap(&raw);
    let id = Uuid::new_v4();
    (id, KeyRecord::new(base64_encode(&wrapped), now))
}
