//! Identity directory — CRUD, token uniqueness and credential lookup.
//!
//! The directory owns the [`RecordStore`] and the [`TokenIndex`]. A token may
//! be held by at most one *active* identity; soft-deleted identities keep
//! their record (and their token) but no longer count for uniqueness or
//! authentication.

use crate::error::{AccessError, Result};
use crate::index::TokenIndex;
use crate::storage::{BackingStore, RecordStore};
use crate::time::{Clock, SystemClock};
use crate::token::canonicalize;

use super::record::{validate_name, Identity, IdentityId, Tier};

/// Fields to change in [`IdentityDirectory::update`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub name: Option<String>,
    pub token: Option<String>,
    pub tier: Option<Tier>,
}

impl IdentityUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.token.is_none() && self.tier.is_none()
    }
}

/// Directory of registered identities.
pub struct IdentityDirectory<B: BackingStore> {
    store: RecordStore<B>,
    index: TokenIndex,
    clock: Box<dyn Clock>,
}

impl<B: BackingStore> IdentityDirectory<B> {
    /// Open the directory over a record store, using the wall clock.
    pub fn open(store: RecordStore<B>) -> Result<Self> {
        Self::with_clock(store, Box::new(SystemClock))
    }

    /// Open the directory with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if the token index cannot be built.
    pub fn with_clock(store: RecordStore<B>, clock: Box<dyn Clock>) -> Result<Self> {
        let mut directory = Self {
            store,
            index: TokenIndex::new(),
            clock,
        };
        directory.rebuild_index()?;
        Ok(directory)
    }

    /// The underlying record store.
    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut RecordStore<B> {
        &mut self.store
    }

    /// Give back the record store.
    pub fn into_store(self) -> RecordStore<B> {
        self.store
    }

    // ── Administration ────────────────────────────────────────────────────────

    /// Register a new active identity and return its id.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidArgument` for a malformed name or token,
    /// `AccessError::Conflict` if an active identity already holds the token,
    /// or `AccessError::StoreFault` if the write fails.
    pub fn create(&mut self, name: &str, token: &str, tier: Tier) -> Result<IdentityId> {
        validate_name(name)?;
        let token = canonicalize(token)?;

        if let Some(holder) = self.find_active(&token)? {
            log::warn!("token {token} already held by identity {}", holder.id);
            return Err(AccessError::Conflict(format!(
                "token {token} is already registered"
            )));
        }

        let record = Identity {
            id: self.store.next_identity_id(),
            name: name.to_string(),
            token,
            tier,
            active: true,
            created_at: self.clock.now(),
            last_seen: 0,
        };
        self.write(None, &record)?;

        log::info!(
            "created identity {} ({}, {}, {})",
            record.id,
            record.name,
            record.token,
            record.tier
        );
        Ok(record.id)
    }

    /// Change any of name, token and tier.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` if there is no record for `id`,
    /// `AccessError::InvalidArgument` for a malformed name or token,
    /// `AccessError::Conflict` if another active identity holds the new
    /// token, or `AccessError::StoreFault` if the write fails.
    pub fn update(&mut self, id: IdentityId, changes: IdentityUpdate) -> Result<()> {
        let current = self.store.get_identity(id)?;
        let mut next = current.clone();

        if let Some(name) = changes.name {
            validate_name(&name)?;
            next.name = name;
        }
        if let Some(token) = changes.token {
            let token = canonicalize(&token)?;
            if let Some(holder) = self.find_active(&token)? {
                if holder.id != id {
                    return Err(AccessError::Conflict(format!(
                        "token {token} is already registered"
                    )));
                }
            }
            next.token = token;
        }
        if let Some(tier) = changes.tier {
            next.tier = tier;
        }

        if next == current {
            return Ok(());
        }
        self.write(Some(&current), &next)?;
        log::info!("updated identity {id}");
        Ok(())
    }

    /// Soft-delete: mark inactive and keep the record. The token becomes
    /// available to other identities.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` if there is no record for `id`, or
    /// `AccessError::StoreFault` if the write fails.
    pub fn delete(&mut self, id: IdentityId) -> Result<()> {
        let current = self.store.get_identity(id)?;
        if !current.active {
            return Ok(());
        }
        let mut next = current.clone();
        next.active = false;
        self.write(Some(&current), &next)?;
        log::info!("deactivated identity {id} ({})", current.name);
        Ok(())
    }

    /// Read one identity, active or not.
    pub fn get(&self, id: IdentityId) -> Result<Identity> {
        self.store.get_identity(id)
    }

    /// Active identities in ascending id order, at most `limit`.
    pub fn list_active(&self, limit: usize) -> Result<Vec<Identity>> {
        self.store
            .iterate_identities(usize::MAX)
            .filter(|r| r.as_ref().map_or(true, |identity| identity.active))
            .take(limit)
            .collect()
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Find the lowest-id active identity holding exactly `token`.
    ///
    /// Pure lookup: no event is written and no field is touched.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` when no active identity matches, or
    /// `AccessError::StoreFault` if the store cannot be read.
    pub fn authenticate(&self, token: &str) -> Result<Identity> {
        self.find_active(token)?
            .ok_or_else(|| AccessError::NotFound(format!("no active identity for token {token}")))
    }

    /// Whether an active identity holds `token`. A store fault reads as
    /// `false` and is logged.
    pub fn token_exists(&self, token: &str) -> bool {
        match self.find_active(token) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("token lookup for {token} failed: {e}");
                false
            }
        }
    }

    /// Stamp a successful authentication and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` if there is no record for `id`, or
    /// `AccessError::StoreFault` if the write fails.
    pub fn touch_last_seen(&mut self, id: IdentityId) -> Result<Identity> {
        let current = self.store.get_identity(id)?;
        let next = Identity {
            // 0 means "never seen".
            last_seen: self.clock.now().max(1),
            ..current.clone()
        };
        self.write(Some(&current), &next)?;
        log::debug!("identity {id} last seen at {}", next.last_seen);
        Ok(next)
    }

    /// Number of active identities.
    pub fn active_count(&self) -> Result<usize> {
        let mut count = 0;
        for record in self.store.iterate_identities(usize::MAX) {
            if record?.active {
                count += 1;
            }
        }
        Ok(count)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn find_active(&self, token: &str) -> Result<Option<Identity>> {
        if !self.index.is_stale() {
            let Some(id) = self.index.get(token) else {
                return Ok(None);
            };
            match self.store.get_identity(id) {
                Ok(record) if record.active && record.token == token => return Ok(Some(record)),
                Ok(_) | Err(AccessError::NotFound(_)) => {
                    log::warn!("token index out of step for {token}, scanning");
                }
                Err(e) => return Err(e),
            }
        }
        self.scan_active(token)
    }

    fn scan_active(&self, token: &str) -> Result<Option<Identity>> {
        for record in self.store.iterate_identities(usize::MAX) {
            let record = record?;
            if record.active && record.token == token {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let records = self
            .store
            .iterate_identities(usize::MAX)
            .collect::<Result<Vec<_>>>()?;
        self.index.rebuild(&records);
        log::debug!("token index rebuilt with {} active tokens", self.index.len());
        Ok(())
    }

    /// Persist `next` and bring the index in line with the change from `previous`.
    fn write(&mut self, previous: Option<&Identity>, next: &Identity) -> Result<()> {
        if let Err(e) = self.store.put_identity(next) {
            // Whether the write landed is unknown until the next one succeeds.
            self.index.mark_stale();
            return Err(e);
        }
        if self.index.is_stale() {
            return self.rebuild_index();
        }

        if let Some(prev) = previous.filter(|p| p.active) {
            let still_holds = next.active && next.token == prev.token;
            if !still_holds && self.index.remove(&prev.token, prev.id) {
                // Only legacy data can hold a token twice; find the next holder.
                if let Some(other) = self.scan_active(&prev.token)? {
                    self.index.insert(&other.token, other.id);
                }
            }
        }
        if next.active {
            self.index.insert(&next.token, next.id);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
