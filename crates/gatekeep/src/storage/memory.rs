//! In-memory namespace.
//!
//! `MemoryStore` keeps committed and staged entries in two maps behind a
//! shared lock, so clones observe the same namespace. "Reopening" a record
//! store over a clone is how tests simulate a restart; [`MemoryStore::crash`]
//! throws away whatever was staged but not committed, as a power cut would.
//!
//! Failures can be injected to exercise partial-write paths:
//! [`MemoryStore::fail_writes_after`] lets a number of writes through and then
//! rejects every following `set`/`erase`, and [`MemoryStore::fail_commits`]
//! makes every `commit` fail.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::BackingStore;
use crate::error::{AccessError, Result};

#[derive(Debug, Default)]
struct Namespace {
    committed: BTreeMap<String, Vec<u8>>,
    /// `None` marks a staged erase.
    staged: BTreeMap<String, Option<Vec<u8>>>,
    writes_left: Option<usize>,
    fail_commits: bool,
    commits: usize,
}

/// Shared in-memory backing store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Namespace>>,
}

impl MemoryStore {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Namespace> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allow `n` more writes, then fail every `set`/`erase` until
    /// [`clear_faults`](Self::clear_faults).
    pub fn fail_writes_after(&self, n: usize) {
        self.lock().writes_left = Some(n);
    }

    /// Make every `commit` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commits = fail;
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        let mut ns = self.lock();
        ns.writes_left = None;
        ns.fail_commits = false;
    }

    /// Drop staged changes, keeping only what was committed.
    pub fn crash(&self) {
        self.lock().staged.clear();
    }

    /// Committed keys, in sorted order.
    pub fn committed_keys(&self) -> Vec<String> {
        self.lock().committed.keys().cloned().collect()
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    fn take_write(ns: &mut Namespace, key: &str) -> Result<()> {
        match ns.writes_left {
            Some(0) => Err(AccessError::StoreFault(format!(
                "injected write failure on '{key}'"
            ))),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl BackingStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let ns = self.lock();
        match ns.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(ns.committed.get(key).cloned()),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let mut ns = self.lock();
        Self::take_write(&mut ns, key)?;
        ns.staged.insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn erase(&mut self, key: &str) -> Result<bool> {
        let mut ns = self.lock();
        Self::take_write(&mut ns, key)?;
        let existed = match ns.staged.get(key) {
            Some(staged) => staged.is_some(),
            None => ns.committed.contains_key(key),
        };
        ns.staged.insert(key.to_string(), None);
        Ok(existed)
    }

    fn commit(&mut self) -> Result<()> {
        let mut ns = self.lock();
        if ns.fail_commits {
            return Err(AccessError::StoreFault("injected commit failure".into()));
        }
        let staged = std::mem::take(&mut ns.staged);
        for (key, value) in staged {
            match value {
                Some(bytes) => {
                    ns.committed.insert(key, bytes);
                }
                None => {
                    ns.committed.remove(&key);
                }
            }
        }
        ns.commits += 1;
        Ok(())
    }
}
