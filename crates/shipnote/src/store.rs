//! Durable key-value storage shared by the summary cache and settings.
//!
//! [`KvStore`] is a small string-to-string interface with
//! last-write-wins semantics. Two implementations ship with the crate:
//!
//! - [`FileStore`] keeps every entry in one JSON object file and rewrites it
//!   atomically (temp file + rename) on each mutation.
//! - [`MemoryStore`] keeps entries in process memory, for tests and
//!   throwaway runs.
//!
//! Callers namespace their keys with a fixed prefix so unrelated data can
//! live in the same store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

/// Key under which the GitLab access token is stored.
pub const GITLAB_TOKEN_KEY: &str = "gitlab_token";

/// Default file name of the store inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

/// A string key-value store.
pub trait KvStore: Send + Sync {
    /// Read the value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, String>;

    /// Insert or overwrite the value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), String>;

    /// Remove `key`. Returns whether an entry existed.
    fn remove(&self, key: &str) -> Result<bool, String>;

    /// All keys currently present, in ascending order.
    fn keys(&self) -> Result<Vec<String>, String>;
}

// ── MemoryStore ────────────────────────────────────────────────────

/// In-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }
}

// ── FileStore ──────────────────────────────────────────────────────

/// JSON-file-backed [`KvStore`].
///
/// Every operation reads the file afresh, and every `set`/`remove` applies
/// its single-key change to that fresh map before writing it back. Several
/// handles (or processes) on one file therefore only ever overwrite the keys
/// they touch. A missing file is treated as an empty store. A file that
/// cannot be parsed is reported as an error rather than silently
/// overwritten.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let entries = load(&path)?;
        debug!("Opened store {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Open `store.json` inside `dir`, creating the directory if needed.
    pub fn open_in(dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create data dir {}: {e}", dir.display()))?;
        Self::open(dir.join(STORE_FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create store dir: {e}"))?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| STORE_FILE_NAME.to_string());
        // Per-process temp name so concurrent writers never share one.
        let tmp_name = format!(".{file_name}.{}.tmp", std::process::id());
        let tmp_path = self.path.with_file_name(tmp_name);

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| format!("Failed to serialize store: {e}"))?;
        std::fs::write(&tmp_path, json).map_err(|e| format!("Failed to write temp store: {e}"))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            warn!("Failed to move store into place at {}", self.path.display());
            return Err(format!("Failed to rename store: {e}"));
        }
        Ok(())
    }
}

/// Read the map at `path`; a missing or blank file is an empty map.
fn load(path: &Path) -> Result<BTreeMap<String, String>, String> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read store {}: {e}", path.display()))?;
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&json)
        .map_err(|e| format!("Failed to parse store {}: {e}", path.display()))
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(load(&self.path)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = load(&self.path)?;
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = load(&self.path)?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>, String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(load(&self.path)?.into_keys().collect())
    }
}
