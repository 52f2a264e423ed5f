//! Rotating API keys with per-key daily quotas.
//!
//! The store maps each key to its usage counter, limit and reset timestamp.
//! Selection is first-fit in file order: the first key with quota left is
//! used, counted and persisted. A key that reaches its limit is locked for
//! [`RATE_LIMIT_WINDOW`] seconds and unlocked (counter zeroed) on the first
//! scan after the window has passed.

use crate::{
    error::{CredentialError, Result},
    mask,
    store::JsonStore,
    unix_now,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How long a key stays locked after reaching its limit (24 hours).
pub const RATE_LIMIT_WINDOW: u64 = 24 * 60 * 60;

/// Usage record for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUsage {
    /// Requests made with this key since the last reset.
    pub used: u32,
    /// Requests allowed before the key is rate-limited.
    pub limit: u32,
    /// Unix seconds at which the key unlocks; `0` means not rate-limited.
    #[serde(default)]
    pub reset_time: u64,
}

impl KeyUsage {
    /// A fresh key with the given limit.
    pub fn new(limit: u32) -> Self {
        Self {
            used: 0,
            limit,
            reset_time: 0,
        }
    }

    fn available(&self) -> bool {
        self.reset_time == 0 && self.used < self.limit
    }
}

/// Key table, in file order.
pub type KeyTable = IndexMap<String, KeyUsage>;

/// First-fit rotating key provider backed by a JSON store.
pub struct RotatingKeys {
    store: JsonStore,
    keys: Mutex<KeyTable>,
}

impl RotatingKeys {
    /// Load the key table from `path`. The file must exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = JsonStore::new(path);
        let keys: KeyTable = store.load()?;
        tracing::debug!(
            "loaded {} rotating keys from {}",
            keys.len(),
            store.path().display()
        );
        Ok(Self {
            store,
            keys: Mutex::new(keys),
        })
    }

    /// Pick a key using the current wall clock.
    pub fn credential(&self) -> Result<String> {
        self.select_at(unix_now())
    }

    /// Pick a key as if the current time were `now` (unix seconds).
    ///
    /// Changes are made on a copy of the table and only take effect once the
    /// store has been written.
    pub fn select_at(&self, now: u64) -> Result<String> {
        let mut keys = self.keys.lock();
        let mut next = keys.clone();
        let mut dirty = false;
        let mut selected = None;

        for (key, usage) in next.iter_mut() {
            if usage.reset_time > 0 && now >= usage.reset_time {
                tracing::info!("key {} unlocked", mask(key));
                usage.reset_time = 0;
                usage.used = 0;
                dirty = true;
            }

            if usage.available() {
                usage.used += 1;
                if usage.used >= usage.limit {
                    usage.reset_time = now + RATE_LIMIT_WINDOW;
                    tracing::warn!("key {} reached its limit, locked for 24h", mask(key));
                }
                tracing::debug!("using key {} ({}/{})", mask(key), usage.used, usage.limit);
                selected = Some(key.clone());
                dirty = true;
                break;
            }
        }

        if dirty {
            self.store.save(&next)?;
            *keys = next;
        }

        selected.ok_or_else(|| {
            tracing::error!("no available keys in {}", self.store.path().display());
            CredentialError::Exhausted(keys.len())
        })
    }

    /// Current usage record for `key`.
    pub fn usage(&self, key: &str) -> Option<KeyUsage> {
        self.keys.lock().get(key).copied()
    }

    /// Copy of the whole key table.
    pub fn snapshot(&self) -> KeyTable {
        self.keys.lock().clone()
    }
}
