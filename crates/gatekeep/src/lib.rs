//! Gatekeep — record store, identity directory and authentication pipeline
//! for an RFID access controller.
//!
//! Identities and access events live as checksummed records in a flat
//! key/value namespace. A scanned card is turned into a token, resolved
//! against the active identities, logged, and announced to grant listeners.

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod identity;
pub mod index;
pub mod pipeline;
pub mod storage;
pub mod time;
pub mod token;

// Re-export primary types
pub use config::ControllerConfig;
pub use controller::{AccessController, ControllerStats};
pub use error::{AccessError, Result};
pub use event::{AccessEvent, CardRead, ScanEvent};
pub use identity::{Identity, IdentityDirectory, IdentityId, IdentityUpdate, Tier};
pub use pipeline::{
    AuthPipeline, Decision, GrantListener, GrantNotice, ListenerError, ScanOutcome, ScanStage,
};
pub use storage::{BackingStore, FileStore, MemoryStore, RecordStore, StoreStats};
pub use time::{Clock, ManualClock, SystemClock};
