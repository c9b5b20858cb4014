//! Identity management — records, tiers, and the directory.
//!
//! The directory is the only component that creates or mutates identity
//! records; everything else reads them through it.

pub mod directory;
pub mod record;

pub use directory::{IdentityDirectory, IdentityUpdate};
pub use record::{validate_name, Identity, IdentityId, Tier, MAX_NAME_LEN};
