//! Scoped key-value storage
//!
//! Two tiers back the session records:
//! - **Durable**: survives restarts. Only read at boot so legacy records can be
//!   deleted; never written by this version.
//! - **Tab**: lives as long as the current terminal session and is the
//!   authoritative home of the session record and lock flag.
//!
//! The adapter carries no business logic. Missing keys read as `None`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::StorageKeys;
use crate::error::StorageError;
use crate::types::Session;

/// Result type for storage tier operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A single string-keyed storage tier
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value; deleting an absent key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object in a single file
///
/// A missing file reads as an empty store. The file is created with owner-only
/// permissions on Unix. Reads report an unparseable file as
/// [`StorageError::Serialization`]; writes discard it and start over.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    /// Open (lazily) a store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Entries to modify, and whether an unparseable file was discarded
    fn load_for_update(&self) -> StorageResult<(BTreeMap<String, String>, bool)> {
        match self.load() {
            Ok(entries) => Ok((entries, false)),
            Err(StorageError::Serialization(e)) => {
                warn!("Discarding unreadable store {}: {}", self.path.display(), e);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(entries)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, _) = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let (mut entries, discarded) = self.load_for_update()?;
        if entries.remove(key).is_some() || discarded {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Storage tier selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Survives restarts
    Durable,
    /// Scoped to the current terminal session
    Tab,
}

/// The two-tier adapter used by the session manager
#[derive(Clone)]
pub struct ScopedStorage {
    durable: Arc<dyn KeyValueStore>,
    tab: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl ScopedStorage {
    /// Wrap a durable and a tab-lifetime tier
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        tab: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
    ) -> Self {
        Self { durable, tab, keys }
    }

    /// Both tiers in memory, default keys
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            StorageKeys::default(),
        )
    }

    /// Select a tier
    pub fn tier(&self, tier: Tier) -> &dyn KeyValueStore {
        match tier {
            Tier::Durable => self.durable.as_ref(),
            Tier::Tab => self.tab.as_ref(),
        }
    }

    /// Keys in use
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Read a key from a tier
    pub fn get(&self, tier: Tier, key: &str) -> StorageResult<Option<String>> {
        self.tier(tier).get(key)
    }

    /// Write a key to a tier
    pub fn set(&self, tier: Tier, key: &str, value: &str) -> StorageResult<()> {
        self.tier(tier).set(key, value)
    }

    /// Delete a key from a tier
    pub fn remove(&self, tier: Tier, key: &str) -> StorageResult<()> {
        self.tier(tier).remove(key)
    }

    /// Raw session record from the tab tier
    pub fn read_session(&self) -> StorageResult<Option<String>> {
        self.tab.get(&self.keys.session)
    }

    /// Write `{ "user": ... }` to the tab tier
    pub fn write_session(&self, user: &Session) -> StorageResult<()> {
        let record = serde_json::json!({ "user": user });
        self.tab.set(&self.keys.session, &record.to_string())
    }

    /// Delete the tab-tier session record
    pub fn remove_session(&self) -> StorageResult<()> {
        self.tab.remove(&self.keys.session)
    }

    /// Raw lock flag from the tab tier
    pub fn read_lock_flag(&self) -> StorageResult<Option<String>> {
        self.tab.get(&self.keys.lock)
    }

    /// Write `"true"`/`"false"` to the tab tier
    pub fn write_lock_flag(&self, locked: bool) -> StorageResult<()> {
        self.tab
            .set(&self.keys.lock, if locked { "true" } else { "false" })
    }

    /// Delete the tab-tier lock flag
    pub fn remove_lock_flag(&self) -> StorageResult<()> {
        self.tab.remove(&self.keys.lock)
    }

    /// Delete both records from the durable tier
    pub fn purge_legacy(&self) -> StorageResult<()> {
        let session = self.durable.remove(&self.keys.session);
        let lock = self.durable.remove(&self.keys.lock);
        session.and(lock)
    }

    /// Delete the first-run guidance markers from both tiers
    pub fn clear_tutorial_markers(&self) -> StorageResult<()> {
        let completed = self.durable.remove(&self.keys.tutorial_completed);
        let active = self.tab.remove(&self.keys.tutorial_active);
        completed.and(active)
    }
}

impl std::fmt::Debug for ScopedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStorage")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
