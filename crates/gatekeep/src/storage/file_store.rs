//! File-backed namespace — the whole key space in one JSON document.
//!
//! The namespace is stored as `{data_dir}/namespace.json`:
//! ```json
//! {
//!     "version": 1,
//!     "entries": { "identity_count": "AwAAAA==", "identity_0": "...", ... }
//! }
//! ```
//! Blobs are base64 (standard alphabet). Writes and erases only touch the
//! in-memory working copy; `commit` writes the complete document to
//! `namespace.json.tmp`, syncs it, and renames it over the old file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::BackingStore;
use crate::error::{AccessError, Result};

// ── File format constants ─────────────────────────────────────────────────────

const NAMESPACE_FILE_VERSION: u32 = 1;
const NAMESPACE_FILE: &str = "namespace.json";
const NAMESPACE_TMP_FILE: &str = "namespace.json.tmp";

// ── On-disk structure ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct NamespaceFile {
    /// Format version number.
    version: u32,
    /// Key → base64 blob.
    entries: BTreeMap<String, String>,
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// Backing store persisted to a single JSON file.
///
/// Safe for single-process use only; two handles over the same directory
/// will overwrite each other's commits.
pub struct FileStore {
    data_dir: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
    dirty: bool,
}

impl FileStore {
    /// Open (or create) the namespace under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if the directory cannot be created,
    /// or the existing namespace file is unreadable, malformed, or of an
    /// unsupported version.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let path = data_dir.join(NAMESPACE_FILE);
        let entries = if path.exists() {
            Self::read_file(&path)?
        } else {
            log::debug!("no namespace at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            data_dir,
            entries,
            dirty: false,
        })
    }

    /// Directory holding the namespace file.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the namespace file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(NAMESPACE_FILE)
    }

    /// Whether there are changes not yet committed.
    pub fn has_uncommitted(&self) -> bool {
        self.dirty
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
        let bytes = std::fs::read(path)?;
        let file: NamespaceFile = serde_json::from_slice(&bytes).map_err(|e| {
            AccessError::StoreFault(format!(
                "failed to parse namespace file {}: {e}",
                path.display()
            ))
        })?;

        if file.version != NAMESPACE_FILE_VERSION {
            return Err(AccessError::StoreFault(format!(
                "unsupported namespace version {} in {}",
                file.version,
                path.display()
            )));
        }

        let engine = base64::engine::general_purpose::STANDARD;
        file.entries
            .into_iter()
            .map(|(key, blob)| {
                let value = engine.decode(blob.as_bytes()).map_err(|e| {
                    AccessError::StoreFault(format!("entry '{key}' is not base64: {e}"))
                })?;
                Ok((key, value))
            })
            .collect()
    }
}

impl BackingStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        self.dirty = true;
        Ok(())
    }

    fn erase(&mut self, key: &str) -> Result<bool> {
        let existed = self.entries.remove(key).is_some();
        self.dirty |= existed;
        Ok(existed)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let engine = base64::engine::general_purpose::STANDARD;
        let file = NamespaceFile {
            version: NAMESPACE_FILE_VERSION,
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), engine.encode(v)))
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let tmp = self.data_dir.join(NAMESPACE_TMP_FILE);
        {
            let mut out = std::fs::File::create(&tmp)?;
            out.write_all(&json)?;
            out.sync_all()?;
        }
        std::fs::rename(&tmp, self.path())?;

        self.dirty = false;
        log::debug!("committed {} entries to {}", self.entries.len(), self.path().display());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
