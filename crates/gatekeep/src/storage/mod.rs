//! Storage layer: the backing-store capability and the record store on top of it.
//!
//! # Namespace layout
//!
//! Every record lives in one flat key space owned by a single
//! [`BackingStore`] handle:
//!
//! ```text
//! identity_count        u32 LE — identities ever created
//! event_count           u32 LE — events appended since the last clear
//! event_clear           u32 LE — present only while a clear is in progress
//! identity_{id}         checksummed Identity record
//! event_{seq}           checksummed AccessEvent record
//! ```
//!
//! # Modules
//!
//! - [`memory`] — in-memory namespace with fault injection, for tests and simulation.
//! - [`file_store`] — JSON-file namespace with an atomic rename commit.
//! - [`codec`] — versioned, checksummed record encoding.
//! - [`record_store`] — typed Identity/AccessEvent operations and the counters.

pub mod codec;
pub mod file_store;
pub mod memory;
pub mod record_store;

pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use record_store::{IdentityIter, RecordStore, StoreStats};

use crate::error::Result;

/// Persistent key-value namespace supplied by the platform.
///
/// Writes and erases are staged until [`commit`](BackingStore::commit);
/// reads on the same handle see staged changes. Each key is updated
/// atomically, but a commit covering several keys may land partially.
///
/// Implementations are not expected to serialize concurrent callers: the
/// record store is the only writer and holds the handle exclusively.
pub trait BackingStore: Send {
    /// Read a blob, `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stage a blob write.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Stage an erase. Returns whether the key existed.
    fn erase(&mut self, key: &str) -> Result<bool>;

    /// Make every staged change durable.
    fn commit(&mut self) -> Result<()>;
}
