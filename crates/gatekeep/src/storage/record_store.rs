//! Record store — typed Identity and AccessEvent operations over a namespace.
//!
//! The record store owns the key layout and the two growth-only counters.
//! Identities live at `identity_{id}` and are addressed directly by id, so a
//! scan over all identities costs O(identity counter) reads; erased or
//! missing slots are skipped. Events live at `event_{seq}`.
//!
//! Counters are cached in memory and only advanced after the commit that
//! persisted them succeeded. On [`RecordStore::open`] the store finishes any
//! interrupted event clear and then reconciles each counter against the
//! records actually present, since a counter write can be lost while the
//! record it covers was not.

use super::codec::{decode_counter, decode_record, encode_counter, encode_record};
use super::BackingStore;
use crate::error::{AccessError, Result};
use crate::event::AccessEvent;
use crate::identity::{Identity, IdentityId};

// ── Key layout ────────────────────────────────────────────────────────────────

pub const KEY_IDENTITY_COUNT: &str = "identity_count";
pub const KEY_EVENT_COUNT: &str = "event_count";
/// Journal entry holding the pre-clear event count while a clear runs.
pub const KEY_EVENT_CLEAR: &str = "event_clear";

pub fn identity_key(id: IdentityId) -> String {
    format!("identity_{id}")
}

pub fn event_key(seq: u32) -> String {
    format!("event_{seq}")
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    /// Identities ever created.
    pub identity_count: u32,
    /// Events appended since the last clear.
    pub event_count: u32,
}

// ── RecordStore ───────────────────────────────────────────────────────────────

/// Store context: the backing-store handle plus its cached counters.
///
/// Mutating operations take `&mut self`; holding the store exclusively is
/// what guarantees a single in-flight write sequence.
pub struct RecordStore<B: BackingStore> {
    backend: B,
    identity_count: u32,
    event_count: u32,
    /// Journaled clear that has not finished yet.
    pending_clear: Option<u32>,
}

impl<B: BackingStore> RecordStore<B> {
    /// Open the store over `backend`, loading counters and repairing any
    /// interrupted clear or lost counter write.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if a counter is unreadable or a
    /// repair cannot be committed.
    pub fn open(backend: B) -> Result<Self> {
        let mut store = Self {
            identity_count: read_counter(&backend, KEY_IDENTITY_COUNT)?,
            event_count: read_counter(&backend, KEY_EVENT_COUNT)?,
            pending_clear: None,
            backend,
        };

        if let Some(blob) = store.backend.get(KEY_EVENT_CLEAR)? {
            let pending = decode_counter(KEY_EVENT_CLEAR, &blob)?;
            log::warn!("resuming interrupted event clear of {pending} entries");
            store.pending_clear = Some(pending);
            store.finish_clear(pending)?;
        }

        store.reconcile_identity_count()?;
        store.reconcile_event_count()?;

        log::debug!(
            "record store open: {} identities, {} events",
            store.identity_count,
            store.event_count
        );
        Ok(store)
    }

    /// The backing-store handle.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backing-store handle back, e.g. to reopen it.
    pub fn into_backend(self) -> B {
        self.backend
    }

    // ── Identities ────────────────────────────────────────────────────────────

    /// Write an identity at its id's key, advancing the identity counter if
    /// the id is at or past it.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if a write or the commit fails. The
    /// staged record may still land with a later commit, so the cached
    /// counters are resynced from the backend and its id is never handed out
    /// again.
    pub fn put_identity(&mut self, record: &Identity) -> Result<()> {
        let result = self.write_identity(record);
        if result.is_err() {
            self.resync_counters();
        }
        result
    }

    /// Read one identity.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` if the slot is empty, or
    /// `AccessError::StoreFault` if it cannot be read or decoded.
    pub fn get_identity(&self, id: IdentityId) -> Result<Identity> {
        match self.backend.get(&identity_key(id))? {
            Some(blob) => decode_record(&blob),
            None => Err(AccessError::NotFound(format!("identity {id}"))),
        }
    }

    /// Lazily walk identities in ascending id order, yielding at most `limit`.
    ///
    /// Empty slots and undecodable records are skipped; only backend read
    /// failures surface as `Err` items. The walk covers ids below the
    /// counter as it was when the iterator was created. Calling this again
    /// starts a fresh walk.
    pub fn iterate_identities(&self, limit: usize) -> IdentityIter<'_, B> {
        IdentityIter {
            store: self,
            next_id: 0,
            end: self.identity_count,
            remaining: limit,
        }
    }

    /// Physically erase an identity slot. Storage reclamation only; a normal
    /// delete is a soft delete written through [`put_identity`](Self::put_identity).
    /// The identity counter is untouched, so the id is never reassigned.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::NotFound` if the slot was already empty, or
    /// `AccessError::StoreFault` if the erase or commit fails.
    pub fn delete_identity_slot(&mut self, id: IdentityId) -> Result<()> {
        if !self.backend.erase(&identity_key(id))? {
            return Err(AccessError::NotFound(format!("identity slot {id}")));
        }
        self.commit("identity slot erase")?;
        log::info!("erased identity slot {id}");
        Ok(())
    }

    /// The id the next created identity receives: identities ever created.
    pub fn next_identity_id(&self) -> IdentityId {
        self.identity_count
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Append an event at the current sequence number and advance the event
    /// counter; both writes go out under one commit.
    ///
    /// The event's `seq` field is overwritten with the assigned number, and
    /// the stored event is returned. A clear that failed part-way is
    /// completed first.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if a write or the commit fails.
    pub fn append_event(&mut self, event: AccessEvent) -> Result<AccessEvent> {
        let result = self.write_event(event);
        if result.is_err() {
            self.resync_counters();
        }
        result
    }

    /// The last `max` events, oldest first. Entries that are missing or
    /// unreadable are skipped, so fewer than `max` may come back.
    pub fn recent_events(&self, max: usize) -> Vec<AccessEvent> {
        let count = self.event_count;
        let start = count.saturating_sub(u32::try_from(max).unwrap_or(u32::MAX));

        (start..count)
            .filter_map(|seq| match self.read_event(seq) {
                Ok(Some(event)) => Some(event),
                Ok(None) => None,
                Err(e) => {
                    log::warn!("skipping unreadable event {seq}: {e}");
                    None
                }
            })
            .collect()
    }

    /// Erase every event and reset the sequence to 0.
    ///
    /// The pre-clear count is journaled first and the counter is reset
    /// before any record is erased. If a step fails, the clear is finished
    /// by the next [`append_event`](Self::append_event) or
    /// [`open`](Self::open), so no stale event is ever read back.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if any step fails to commit.
    pub fn clear_events(&mut self) -> Result<()> {
        let pending = self.event_count.max(self.pending_clear.unwrap_or(0));
        if pending == 0 && self.pending_clear.is_none() {
            return Ok(());
        }

        self.backend.set(KEY_EVENT_CLEAR, &encode_counter(pending))?;
        // A staged journal may land with any later commit.
        self.pending_clear = Some(pending);
        self.commit("event clear journal")?;
        self.finish_clear(pending)?;

        log::info!("cleared {pending} events");
        Ok(())
    }

    /// Current event counter.
    pub fn event_count(&self) -> u32 {
        self.event_count
    }

    /// Both counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            identity_count: self.identity_count,
            event_count: self.event_count,
        }
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn read_event(&self, seq: u32) -> Result<Option<AccessEvent>> {
        match self.backend.get(&event_key(seq))? {
            Some(blob) => decode_record(&blob).map(Some),
            None => Ok(None),
        }
    }

    fn commit(&mut self, what: &str) -> Result<()> {
        self.backend.commit().map_err(|e| {
            log::error!("{what} commit failed: {e}");
            e
        })
    }

    /// Steps 2–4 of a clear: reset the counter, erase `0..pending`, drop the journal.
    fn finish_clear(&mut self, pending: u32) -> Result<()> {
        self.backend.set(KEY_EVENT_COUNT, &encode_counter(0))?;
        self.commit("event counter reset")?;
        self.event_count = 0;

        for seq in 0..pending {
            self.backend.erase(&event_key(seq))?;
        }
        self.commit("event erase")?;

        self.backend.erase(KEY_EVENT_CLEAR)?;
        self.commit("event clear journal removal")?;
        self.pending_clear = None;
        Ok(())
    }

    fn write_identity(&mut self, record: &Identity) -> Result<()> {
        let blob = encode_record(record)?;
        self.backend.set(&identity_key(record.id), &blob)?;

        let new_count = if record.id >= self.identity_count {
            let next = record.id.checked_add(1).ok_or_else(|| {
                AccessError::StoreFault("identity counter exhausted".into())
            })?;
            self.backend.set(KEY_IDENTITY_COUNT, &encode_counter(next))?;
            Some(next)
        } else {
            None
        };

        self.commit("identity write")?;
        if let Some(next) = new_count {
            self.identity_count = next;
        }
        log::debug!("stored identity {}", record.id);
        Ok(())
    }

    fn write_event(&mut self, mut event: AccessEvent) -> Result<AccessEvent> {
        if let Some(pending) = self.pending_clear {
            log::warn!("completing unfinished event clear before append");
            self.finish_clear(pending)?;
        }

        let seq = self.event_count;
        let next = seq
            .checked_add(1)
            .ok_or_else(|| AccessError::StoreFault("event counter exhausted".into()))?;
        event.seq = seq;

        let blob = encode_record(&event)?;
        self.backend.set(&event_key(seq), &blob)?;
        self.backend.set(KEY_EVENT_COUNT, &encode_counter(next))?;
        self.commit("event append")?;

        self.event_count = next;
        log::debug!("appended event {seq}");
        Ok(event)
    }

    /// Bring the cached counters in line with what the backend now shows.
    ///
    /// Reads see staged writes, and a staged write left behind by a failed
    /// commit lands with the next successful one. Counters only ever move
    /// forward here, so no id or sequence number can be assigned twice.
    fn resync_counters(&mut self) {
        let identity_floor = read_counter(&self.backend, KEY_IDENTITY_COUNT)
            .unwrap_or(0)
            .max(self.identity_count);
        match self.first_free_slot(identity_floor, identity_key) {
            Ok(count) if count != self.identity_count => {
                log::warn!(
                    "identity counter resynced after failed write: {} -> {count}",
                    self.identity_count
                );
                self.identity_count = count;
            }
            Ok(_) => {}
            Err(e) => log::warn!("identity counter resync failed: {e}"),
        }

        // An unfinished clear resets the counter and erases every slot below
        // its journal before anything else is appended.
        if self.pending_clear.is_some() {
            return;
        }
        let event_floor = read_counter(&self.backend, KEY_EVENT_COUNT)
            .unwrap_or(0)
            .max(self.event_count);
        match self.first_free_slot(event_floor, event_key) {
            Ok(count) if count != self.event_count => {
                log::warn!(
                    "event counter resynced after failed write: {} -> {count}",
                    self.event_count
                );
                self.event_count = count;
            }
            Ok(_) => {}
            Err(e) => log::warn!("event counter resync failed: {e}"),
        }
    }

    /// First slot at or after `start` whose key is absent.
    fn first_free_slot(&self, start: u32, key: fn(u32) -> String) -> Result<u32> {
        let mut count = start;
        while count < u32::MAX && self.backend.get(&key(count))?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    fn reconcile_identity_count(&mut self) -> Result<()> {
        let count = self.first_free_slot(self.identity_count, identity_key)?;
        if count != self.identity_count {
            log::warn!(
                "identity counter behind stored records, advancing {} -> {count}",
                self.identity_count
            );
            self.backend.set(KEY_IDENTITY_COUNT, &encode_counter(count))?;
            self.commit("identity counter repair")?;
            self.identity_count = count;
        }
        Ok(())
    }

    fn reconcile_event_count(&mut self) -> Result<()> {
        let count = self.first_free_slot(self.event_count, event_key)?;
        if count != self.event_count {
            log::warn!(
                "event counter behind stored records, advancing {} -> {count}",
                self.event_count
            );
            self.backend.set(KEY_EVENT_COUNT, &encode_counter(count))?;
            self.commit("event counter repair")?;
            self.event_count = count;
        }
        Ok(())
    }
}

fn read_counter<B: BackingStore>(backend: &B, key: &str) -> Result<u32> {
    match backend.get(key)? {
        Some(blob) => decode_counter(key, &blob),
        None => Ok(0),
    }
}

// ── IdentityIter ──────────────────────────────────────────────────────────────

/// Iterator returned by [`RecordStore::iterate_identities`].
pub struct IdentityIter<'a, B: BackingStore> {
    store: &'a RecordStore<B>,
    next_id: IdentityId,
    end: IdentityId,
    remaining: usize,
}

impl<B: BackingStore> Iterator for IdentityIter<'_, B> {
    type Item = Result<Identity>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.next_id < self.end {
            let id = self.next_id;
            self.next_id += 1;

            let blob = match self.store.backend.get(&identity_key(id)) {
                Ok(Some(blob)) => blob,
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            };
            match decode_record::<Identity>(&blob) {
                Ok(identity) => {
                    self.remaining -= 1;
                    return Some(Ok(identity));
                }
                Err(e) => log::warn!("skipping unreadable identity {id}: {e}"),
            }
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
