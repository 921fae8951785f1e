//! Per-provider, per-key JSON cache on the filesystem (C2).
//!
//! Each provider gets its own subdirectory; each key gets its own file.
//! Writes are made atomic by writing to a temp file in the same directory
//! and renaming over the target, so a reader never observes a half-written
//! entry — at worst it sees the previous entry or nothing at all.

mod entry;
mod error;
mod key;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use key::sanitize_key;

use loader_core::JsonValue;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Summary statistics for one provider's cache directory.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub expired_count: usize,
}

/// Filesystem cache store, rooted at a base directory under which one
/// subdirectory per provider is created on demand.
pub struct CacheStore {
    base_dir: PathBuf,
    default_ttl_days: u32,
    enabled: bool,
}

impl CacheStore {
    pub fn new(base_dir: impl Into<PathBuf>, default_ttl_days: u32) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_ttl_days,
            enabled: true,
        }
    }

    /// Builds a disabled store: every operation becomes a no-op. Used when
    /// the caller has turned caching off entirely.
    pub fn disabled(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_ttl_days: 7,
            enabled: false,
        }
    }

    fn provider_dir(&self, provider: &str) -> PathBuf {
        self.base_dir.join(format!("{provider}_cache"))
    }

    fn entry_path(&self, provider: &str, key: &str) -> PathBuf {
        self.provider_dir(provider).join(sanitize_key(key))
    }

    /// Writes `value` under `(provider, key)`. Returns `Ok(true)` on a
    /// successful write, `Ok(false)` when the cache is disabled.
    pub fn set(
        &self,
        provider: &str,
        key: &str,
        value: JsonValue,
        ttl_days_override: Option<u32>,
    ) -> Result<bool, CacheError> {
        if !self.enabled {
            return Ok(false);
        }

        let dir = self.provider_dir(provider);
        fs::create_dir_all(&dir)?;

        let entry = CacheEntry {
            data: value,
            timestamp: now_unix_seconds(),
            ttl_days: ttl_days_override.unwrap_or(self.default_ttl_days),
            provider: provider.to_string(),
            key: key.to_string(),
        };
        let encoded = serde_json::to_vec_pretty(&entry)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&encoded)?;
        temp.flush()?;
        temp.persist(self.entry_path(provider, key))
            .map_err(|e| CacheError::Io(e.error))?;

        tracing::debug!(provider, key, "cache entry written");
        Ok(true)
    }

    /// Reads the entry for `(provider, key)`. Corrupt or missing files are
    /// both reported as `Ok(None)` — callers cannot distinguish "absent"
    /// from "unreadable", by design (§4.2 corruption tolerance).
    pub fn get(
        &self,
        provider: &str,
        key: &str,
        ignore_expired: bool,
    ) -> Result<Option<CacheEntry>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.entry_path(provider, key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e)),
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(_) => {
                tracing::warn!(provider, key, "discarding corrupt cache entry");
                return Ok(None);
            }
        };

        if !ignore_expired && entry.is_expired(now_unix_seconds()) {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    pub fn exists(&self, provider: &str, key: &str) -> bool {
        self.entry_path(provider, key).is_file()
    }

    pub fn delete(&self, provider: &str, key: &str) -> Result<bool, CacheError> {
        if !self.enabled {
            return Ok(false);
        }
        match fs::remove_file(self.entry_path(provider, key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    /// Deletes every entry for `provider`, returning the count removed.
    pub fn clear_provider(&self, provider: &str) -> Result<usize, CacheError> {
        if !self.enabled {
            return Ok(0);
        }
        let dir = self.provider_dir(provider);
        let mut removed = 0usize;
        match fs::read_dir(&dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if fs::remove_file(entry.path()).is_ok() {
                        removed += 1;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::Io(e)),
        }
        Ok(removed)
    }

    /// Deletes expired (and unreadable) entries for `provider`, or for every
    /// known provider directory if `provider` is `None`.
    pub fn clear_expired(&self, provider: Option<&str>) -> Result<usize, CacheError> {
        if !self.enabled {
            return Ok(0);
        }
        let dirs: Vec<PathBuf> = match provider {
            Some(p) => vec![self.provider_dir(p)],
            None => self.all_provider_dirs()?,
        };

        let now = now_unix_seconds();
        let mut removed = 0usize;
        for dir in dirs {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(CacheError::Io(e)),
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let expired_or_corrupt = match fs::read(&path) {
                    Ok(bytes) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                        Ok(entry) => entry.is_expired(now),
                        Err(_) => true,
                    },
                    Err(_) => true,
                };
                if expired_or_corrupt && fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    pub fn stats(&self, provider: &str) -> Result<CacheStats, CacheError> {
        let dir = self.provider_dir(provider);
        let mut stats = CacheStats::default();
        let now = now_unix_seconds();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(CacheError::Io(e)),
        };
        for entry in entries.flatten() {
            stats.entry_count += 1;
            if let Ok(bytes) = fs::read(entry.path()) {
                match serde_json::from_slice::<CacheEntry>(&bytes) {
                    Ok(entry) if entry.is_expired(now) => stats.expired_count += 1,
                    Err(_) => stats.expired_count += 1,
                    _ => {}
                }
            }
        }
        Ok(stats)
    }

    fn all_provider_dirs(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut dirs = Vec::new();
        match fs::read_dir(&self.base_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    if entry.path().is_dir() {
                        dirs.push(entry.path());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::Io(e)),
        }
        Ok(dirs)
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Cache directory convention used by a running orchestrator:
/// `<base>/<provider>_cache/`.
pub fn provider_cache_dir(base: &Path, provider: &str) -> PathBuf {
    base.join(format!("{provider}_cache"))
}
