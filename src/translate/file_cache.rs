//! Persisted translation cache backed by a JSON file.
//! Format: map of "source:target:text" to either a bare string or
//! `{"value": ..., "timestamp": unix_secs}` for TTL-aware entries.
//! The whole file is rewritten on every mutation, never appended.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedEntry {
    Timed { value: String, timestamp: i64 },
    Plain(String),
}

impl PersistedEntry {
    fn value(&self) -> &str {
        match self {
            PersistedEntry::Plain(v) => v,
            PersistedEntry::Timed { value, .. } => value,
        }
    }

    fn timestamp(&self) -> Option<i64> {
        match self {
            PersistedEntry::Plain(_) => None,
            PersistedEntry::Timed { timestamp, .. } => Some(*timestamp),
        }
    }
}

pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, PersistedEntry>>,
    ttl: Option<Duration>,
}

impl FileCache {
    /// Open the cache file, starting empty when it is missing or unreadable.
    pub fn open(path: &Path, ttl: Option<Duration>) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "file cache opened");
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
            ttl,
        }
    }

    pub fn compute_key(source: &str, target: &str, text: &str) -> String {
        format!("{source}:{target}:{text}")
    }

    /// Side-effecting read: a TTL-expired entry is dropped from the map.
    /// Entries persisted without a timestamp never expire.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let expired = match (self.ttl, entries.get(key)) {
            (Some(ttl), Some(entry)) => match entry.timestamp() {
                Some(stored) => now_unix() - stored >= ttl.as_secs() as i64,
                None => false,
            },
            _ => false,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value().to_string())
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock();
        let entry = if self.ttl.is_some() {
            PersistedEntry::Timed {
                value: value.to_string(),
                timestamp: now_unix(),
            }
        } else {
            PersistedEntry::Plain(value.to_string())
        };
        entries.insert(key.to_string(), entry);
        self.save(&entries);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.save(&entries);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, entries: &HashMap<String, PersistedEntry>) {
        match serde_json::to_string_pretty(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    warn!(path = %self.path.display(), error = %e, "cache file write failed");
                }
            }
            Err(e) => warn!(error = %e, "cache serialization failed"),
        }
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
