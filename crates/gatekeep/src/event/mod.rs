//! Reader input and access events.
//!
//! A [`ScanEvent`] is what the reader driver delivers; a [`CardRead`] is the
//! same scan after token extraction; an [`AccessEvent`] is the immutable log
//! entry written for every attempt.

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};
use crate::identity::IdentityId;
use crate::token::{uid_to_token, MAX_UID_LEN};

/// Longest location tag, in bytes.
pub const MAX_LOCATION_LEN: usize = 31;

/// Identity id recorded for scans that matched no active identity.
pub const UNAUTHENTICATED: IdentityId = 0;

/// One credential presentation from the reader driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanEvent {
    uid: [u8; MAX_UID_LEN],
    len: u8,
    /// Seconds since Unix epoch, as stamped by the driver.
    pub timestamp: u64,
}

impl ScanEvent {
    /// Build a scan event from raw UID bytes.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidArgument` if `uid` is empty or longer
    /// than [`MAX_UID_LEN`].
    pub fn new(uid: &[u8], timestamp: u64) -> Result<Self> {
        if uid.is_empty() || uid.len() > MAX_UID_LEN {
            return Err(AccessError::InvalidArgument(format!(
                "UID must be 1..={MAX_UID_LEN} bytes, got {}",
                uid.len()
            )));
        }
        let mut buf = [0u8; MAX_UID_LEN];
        buf[..uid.len()].copy_from_slice(uid);
        Ok(Self {
            uid: buf,
            len: uid.len() as u8,
            timestamp,
        })
    }

    /// The UID bytes actually read.
    pub fn uid(&self) -> &[u8] {
        &self.uid[..self.len as usize]
    }

    /// Convert to a card read with its canonical token.
    pub fn to_card(&self) -> CardRead {
        CardRead {
            uid: self.uid().to_vec(),
            token: uid_to_token(self.uid()),
            timestamp: self.timestamp,
        }
    }
}

/// A scanned card after token extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRead {
    pub uid: Vec<u8>,
    pub token: String,
    pub timestamp: u64,
}

/// Immutable record of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Position in the log; assigned by the record store.
    pub seq: u32,
    /// Matched identity, or [`UNAUTHENTICATED`].
    pub identity_id: IdentityId,
    /// Token as presented.
    pub token: String,
    pub timestamp: u64,
    pub granted: bool,
    pub location: String,
}

impl AccessEvent {
    /// Event for a granted scan. The sequence number is filled in on append.
    pub fn granted(identity_id: IdentityId, card: &CardRead, location: &str) -> Self {
        Self {
            seq: 0,
            identity_id,
            token: card.token.clone(),
            timestamp: card.timestamp,
            granted: true,
            location: location.to_string(),
        }
    }

    /// Event for a denied scan. Unknown and inactive credentials look the same.
    pub fn denied(card: &CardRead, location: &str) -> Self {
        Self {
            seq: 0,
            identity_id: UNAUTHENTICATED,
            token: card.token.clone(),
            timestamp: card.timestamp,
            granted: false,
            location: location.to_string(),
        }
    }
}

/// Validate a location tag.
pub fn validate_location(location: &str) -> Result<()> {
    if location.trim().is_empty() || location.len() > MAX_LOCATION_LEN {
        return Err(AccessError::InvalidArgument(format!(
            "location must be 1..={MAX_LOCATION_LEN} bytes, got {}",
            location.len()
        )));
    }
    Ok(())
}
