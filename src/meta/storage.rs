//! Key-value metadata storage implementation.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed keys the store persists under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKey {
    Assets,
    ActivityLog,
    AuditLogs,
}

impl MetaKey {
    fn file_name(&self) -> &'static str {
        match self {
            MetaKey::Assets => "assets.json",
            MetaKey::ActivityLog => "activity_log.json",
            MetaKey::AuditLogs => "audit_logs.json",
        }
    }
}

/// Durable JSON storage for the store's record collections.
///
/// Absent or unreadable files read back as `None` (callers treat that as an
/// empty collection). Write failures propagate to the caller; the in-memory
/// state that prompted the write is never rolled back, so a failed save
/// leaves memory ahead of disk until the next successful one.
pub struct MetadataStorage {
    path: PathBuf,
}

impl MetadataStorage {
    /// Create metadata storage rooted at the given directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Load and decode the collection stored under `key`.
    ///
    /// Returns `None` when the file is absent or its content cannot be
    /// parsed; corruption is logged, never surfaced as an error.
    pub fn load<T: DeserializeOwned>(&self, key: MetaKey) -> Option<T> {
        let raw = self.read_string(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key.file_name(), error = %e, "discarding unreadable metadata");
                None
            }
        }
    }

    /// Load the raw JSON value stored under `key` (used by the migration
    /// pass, which rewrites legacy spellings before typed decoding).
    pub fn load_raw(&self, key: MetaKey) -> Option<serde_json::Value> {
        self.load(key)
    }

    /// Serialize and durably write the collection under `key`.
    ///
    /// Writes go through a temp file followed by a rename, so a crash
    /// mid-write leaves the previous snapshot intact.
    pub fn save<T: Serialize + ?Sized>(&self, key: MetaKey, value: &T) -> Result<()> {
        let encoded = serde_json::to_vec(value)?;

        let final_path = self.file_path(key);
        let tmp_path = final_path.with_extension("json.tmp");

        let mut file = File::create(&tmp_path)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;

        debug!(key = key.file_name(), bytes = encoded.len(), "metadata saved");
        Ok(())
    }

    /// Path of the file backing `key` (exists only after the first save).
    pub fn file_path(&self, key: MetaKey) -> PathBuf {
        self.path.join(key.file_name())
    }

    /// Size in bytes of the file backing `key`, 0 if absent.
    pub fn file_size(&self, key: MetaKey) -> u64 {
        fs::metadata(self.file_path(key))
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn read_string(&self, key: MetaKey) -> Option<String> {
        let path = self.file_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!(key = key.file_name(), error = %e, "failed to read metadata file");
                None
            }
        }
    }
}
