//! Persistent evaluation cache.
//!
//! Maps canonical position keys to scored values so an external scoring
//! service is asked at most once per distinct position, across runs. The
//! cache is a JSON file loaded eagerly at startup and written back with an
//! atomic rename so a crash mid-save never corrupts it.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A cached evaluation for one canonical position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Value in [-1.0, 1.0] for the side to move at the position.
    pub value: f32,

    /// Scorer's explanation, kept for offline inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Thread-safe cache of position evaluations backed by a JSON file.
pub struct EvalCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl EvalCache {
    /// Load the cache from `path`.
    ///
    /// A missing or unreadable file yields an empty cache; a corrupt file is
    /// logged and likewise treated as empty rather than aborting the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&contents) {
                Ok(map) => {
                    debug!(path = %path.display(), entries = map.len(), "loaded evaluation cache");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "evaluation cache is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read evaluation cache, starting empty");
                HashMap::new()
            }
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// In-memory cache that saves to `path` later. Used by tests that start
    /// from a known-empty state.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: String, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache to disk atomically.
    ///
    /// Serializes to a sibling temp file first and renames it over the
    /// target, so readers never observe a half-written file.
    pub fn save(&self) -> io::Result<()> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_string_pretty(&*entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        drop(entries);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved evaluation cache");
        Ok(())
    }
}
