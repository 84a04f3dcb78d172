//! Persistent cache of generated summaries, keyed by project and tag range.
//!
//! Entries live in a [`KvStore`] under the `ai_summary_cache_` prefix and are
//! serialized as `{summary, timestamp, fromTag, toTag, project}` with the
//! timestamp in epoch milliseconds. An entry older than [`CACHE_MAX_AGE_DAYS`] is
//! treated as absent and deleted the first time a lookup finds it.
//!
//! The cache never fails outward: storage and parse errors are logged and
//! degrade to a miss (or a no-op for writes).

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::store::KvStore;

/// Prefix shared by every cache key.
pub const CACHE_PREFIX: &str = "ai_summary_cache_";

/// Maximum age of a usable entry, in days.
pub const CACHE_MAX_AGE_DAYS: i64 = 30;

/// Source of "now" in epoch milliseconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// Derive the storage key for a `(project, from_tag, to_tag)` triple.
pub fn cache_key(project: &str, from_tag: &str, to_tag: &str) -> String {
    format!("{CACHE_PREFIX}__{project}__{from_tag}__{to_tag}")
}

/// Persisted form of a cached summary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub summary: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub from_tag: String,
    pub to_tag: String,
    pub project: String,
}

/// Diagnostic view of one cached entry.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheStatEntry {
    pub project: String,
    pub from_tag: String,
    pub to_tag: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Milliseconds since creation.
    pub age: i64,
}

/// Snapshot returned by [`SummaryCache::stats`].
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of keys under the cache prefix, parsable or not.
    pub total_cached: usize,
    pub entries: Vec<CacheStatEntry>,
}

/// Summary cache over a shared [`KvStore`].
#[derive(Clone)]
pub struct SummaryCache {
    store: Arc<dyn KvStore>,
    clock: Clock,
}

impl SummaryCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            clock: system_clock,
        }
    }

    /// Replace the clock (tests pin time with this).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Look up a fresh summary. Expired entries are removed as a side effect.
    pub fn get(&self, project: &str, from_tag: &str, to_tag: &str) -> Option<String> {
        if project.is_empty() || from_tag.is_empty() || to_tag.is_empty() {
            return None;
        }

        let key = cache_key(project, from_tag, to_tag);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading summary cache: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {key}: {e}");
                return None;
            }
        };

        let age = (self.clock)() - entry.timestamp;
        if age > TimeDelta::days(CACHE_MAX_AGE_DAYS).num_milliseconds() {
            debug!("Cache entry {key} expired ({age} ms old)");
            if let Err(e) = self.store.remove(&key) {
                warn!("Failed to remove expired cache entry {key}: {e}");
            }
            return None;
        }

        info!("Using cached summary for {project} {from_tag} -> {to_tag}");
        Some(entry.summary)
    }

    /// Store a summary. Any empty argument makes this a no-op.
    pub fn put(&self, project: &str, from_tag: &str, to_tag: &str, summary: &str) {
        if project.is_empty() || from_tag.is_empty() || to_tag.is_empty() || summary.is_empty() {
            return;
        }

        let entry = CacheEntry {
            summary: summary.to_string(),
            timestamp: (self.clock)(),
            from_tag: from_tag.to_string(),
            to_tag: to_tag.to_string(),
            project: project.to_string(),
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize cache entry: {e}");
                return;
            }
        };

        match self.store.set(&cache_key(project, from_tag, to_tag), &json) {
            Ok(()) => info!("Cached summary for {project} {from_tag} -> {to_tag}"),
            Err(e) => warn!("Error saving summary cache: {e}"),
        }
    }

    /// Remove one entry if present.
    pub fn clear(&self, project: &str, from_tag: &str, to_tag: &str) {
        if project.is_empty() || from_tag.is_empty() || to_tag.is_empty() {
            return;
        }
        match self.store.remove(&cache_key(project, from_tag, to_tag)) {
            Ok(true) => info!("Cleared cache for {project} {from_tag} -> {to_tag}"),
            Ok(false) => {}
            Err(e) => warn!("Error clearing cache entry: {e}"),
        }
    }

    /// Remove every cache entry. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let keys = match self.cache_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Error listing summary cache: {e}");
                return 0;
            }
        };

        let mut cleared = 0;
        for key in keys {
            match self.store.remove(&key) {
                Ok(true) => cleared += 1,
                Ok(false) => {}
                Err(e) => warn!("Error removing cache entry {key}: {e}"),
            }
        }
        info!("Cleared {cleared} cached summaries");
        cleared
    }

    /// Diagnostic snapshot of the cache.
    pub fn stats(&self) -> CacheStats {
        let keys = match self.cache_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Error reading cache stats: {e}");
                return CacheStats::default();
            }
        };

        let now = (self.clock)();
        let entries = keys
            .iter()
            .filter_map(|key| self.store.get(key).ok().flatten())
            .filter_map(|raw| serde_json::from_str::<CacheEntry>(&raw).ok())
            .map(|entry| CacheStatEntry {
                age: now - entry.timestamp,
                created_at: entry.timestamp,
                project: entry.project,
                from_tag: entry.from_tag,
                to_tag: entry.to_tag,
            })
            .collect();

        CacheStats {
            total_cached: keys.len(),
            entries,
        }
    }

    fn cache_keys(&self) -> Result<Vec<String>, String> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(CACHE_PREFIX))
            .collect())
    }
}
