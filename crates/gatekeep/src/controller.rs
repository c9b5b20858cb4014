//! Access controller — the administration surface plus the reader entry point.
//!
//! [`AccessController`] owns the identity directory (and through it the
//! record store and backing-store handle) together with the authentication
//! pipeline. Every mutating call takes `&mut self`; callers that share a
//! controller between threads wrap it in a `Mutex`, which serializes reader
//! scans and administrative writes alike.

use serde::Serialize;

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::event::{AccessEvent, CardRead, ScanEvent};
use crate::identity::{Identity, IdentityDirectory, IdentityId, IdentityUpdate, Tier};
use crate::pipeline::{AuthPipeline, GrantListener, ScanOutcome};
use crate::storage::{BackingStore, RecordStore};
use crate::time::{Clock, SystemClock};

/// Status snapshot for the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Identities ever created.
    pub identity_count: u32,
    /// Events appended since the last clear.
    pub event_count: u32,
    /// Identities not soft-deleted.
    pub active_identities: usize,
    pub location: String,
}

/// One controller per backing-store handle.
pub struct AccessController<B: BackingStore> {
    directory: IdentityDirectory<B>,
    pipeline: AuthPipeline,
    config: ControllerConfig,
}

impl<B: BackingStore> AccessController<B> {
    /// Open over `backend` with the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidArgument` for a bad config, or
    /// `AccessError::StoreFault` if the store cannot be opened.
    pub fn open(backend: B, config: ControllerConfig) -> Result<Self> {
        Self::with_clock(backend, config, Box::new(SystemClock))
    }

    /// Open with an explicit clock.
    pub fn with_clock(backend: B, config: ControllerConfig, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let store = RecordStore::open(backend)?;
        let directory = IdentityDirectory::with_clock(store, clock)?;
        let pipeline = AuthPipeline::new(config.location.clone());

        let stats = directory.store().stats();
        log::info!(
            "controller ready at {}: {} identities, {} events",
            config.location,
            stats.identity_count,
            stats.event_count
        );
        Ok(Self {
            directory,
            pipeline,
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn directory(&self) -> &IdentityDirectory<B> {
        &self.directory
    }

    /// Close the controller and hand back the backing store.
    pub fn into_backend(self) -> B {
        self.directory.into_store().into_backend()
    }

    // ── Identities ────────────────────────────────────────────────────────────

    /// Register an identity. See [`IdentityDirectory::create`].
    pub fn create_identity(&mut self, name: &str, token: &str, tier: Tier) -> Result<IdentityId> {
        self.directory.create(name, token, tier)
    }

    /// See [`IdentityDirectory::update`].
    pub fn update_identity(&mut self, id: IdentityId, changes: IdentityUpdate) -> Result<()> {
        self.directory.update(id, changes)
    }

    /// Soft-delete. See [`IdentityDirectory::delete`].
    pub fn delete_identity(&mut self, id: IdentityId) -> Result<()> {
        self.directory.delete(id)
    }

    pub fn get_identity(&self, id: IdentityId) -> Result<Identity> {
        self.directory.get(id)
    }

    /// Active identities in id order; `None` uses the configured page size.
    pub fn list_identities(&self, limit: Option<usize>) -> Result<Vec<Identity>> {
        self.directory
            .list_active(limit.unwrap_or(self.config.list_limit))
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Most recent events, oldest first; `None` uses the configured page size.
    pub fn list_recent_events(&self, limit: Option<usize>) -> Vec<AccessEvent> {
        self.directory
            .store()
            .recent_events(limit.unwrap_or(self.config.event_limit))
    }

    /// Erase the access log and restart its sequence at 0.
    pub fn clear_events(&mut self) -> Result<()> {
        self.directory.store_mut().clear_events()
    }

    // ── Reader ────────────────────────────────────────────────────────────────

    /// Process one reader scan. See [`AuthPipeline::process`].
    pub fn handle_scan(&mut self, scan: &ScanEvent) -> Result<ScanOutcome> {
        self.pipeline.process(&mut self.directory, scan)
    }

    /// Register a listener for granted scans.
    pub fn add_listener(&mut self, listener: impl GrantListener + 'static) {
        self.pipeline.add_listener(listener);
    }

    /// The last card the reader delivered.
    pub fn last_card(&self) -> Option<&CardRead> {
        self.pipeline.last_card()
    }

    pub fn stats(&self) -> Result<ControllerStats> {
        let store = self.directory.store().stats();
        Ok(ControllerStats {
            identity_count: store.identity_count,
            event_count: store.event_count,
            active_identities: self.directory.active_count()?,
            location: self.config.location.clone(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
