//! In-memory token index for credential lookups.
//!
//! [`TokenIndex`] maps each credential token held by an *active* identity to
//! the lowest such id, which is exactly what an ascending linear scan for the
//! first active match would find. It is rebuilt from the record store when
//! the directory opens and kept in step with every identity write.
//!
//! If an identity write fails the directory cannot know what actually landed,
//! so it marks the index stale; lookups fall back to a linear scan until the
//! next successful rebuild.

use std::collections::HashMap;

use crate::identity::{Identity, IdentityId};

/// Token → lowest active identity id.
#[derive(Debug, Default)]
pub struct TokenIndex {
    by_token: HashMap<String, IdentityId>,
    stale: bool,
}

impl TokenIndex {
    /// Create an empty, fresh index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the active identities in `records`.
    pub fn rebuild<'a>(&mut self, records: impl IntoIterator<Item = &'a Identity>) {
        self.by_token.clear();
        for record in records {
            if record.active {
                self.insert(&record.token, record.id);
            }
        }
        self.stale = false;
    }

    /// Record that `id` holds `token`. An existing lower id keeps the entry.
    pub fn insert(&mut self, token: &str, id: IdentityId) {
        self.by_token
            .entry(token.to_string())
            .and_modify(|held| *held = (*held).min(id))
            .or_insert(id);
    }

    /// Drop `token` if it currently resolves to `id`. Returns whether an
    /// entry was removed; the caller must then look for another holder.
    pub fn remove(&mut self, token: &str, id: IdentityId) -> bool {
        match self.by_token.get(token) {
            Some(held) if *held == id => {
                self.by_token.remove(token);
                true
            }
            _ => false,
        }
    }

    /// Look up the id holding `token`.
    pub fn get(&self, token: &str) -> Option<IdentityId> {
        self.by_token.get(token).copied()
    }

    /// Number of distinct active tokens.
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// Return `true` when no active token is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Stop trusting the index until the next rebuild.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Whether lookups must bypass the index.
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
