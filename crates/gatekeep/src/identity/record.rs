//! Identity record and permission tiers.

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};

/// Identifier assigned to an identity at creation; never reused.
pub type IdentityId = u32;

/// Longest identity name, in bytes.
pub const MAX_NAME_LEN: usize = 63;

/// Permission level of an identity.
///
/// Stored as its numeric code (1–3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    Member,
    Trainer,
    Admin,
}

impl Tier {
    /// Numeric code used in storage and by administration clients.
    pub fn code(self) -> u8 {
        match self {
            Self::Member => 1,
            Self::Trainer => 2,
            Self::Admin => 3,
        }
    }

    /// Parse a numeric code.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidArgument` for anything outside 1–3.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Member),
            2 => Ok(Self::Trainer),
            3 => Ok(Self::Admin),
            other => Err(AccessError::InvalidArgument(format!(
                "invalid tier code {other}"
            ))),
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Trainer => "Trainer",
            Self::Admin => "Admin",
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.code()
    }
}

impl TryFrom<u8> for Tier {
    type Error = AccessError;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Tier {
    type Err = AccessError;

    /// Accepts the name in any case, or the numeric code.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" | "1" => Ok(Self::Member),
            "trainer" | "2" => Ok(Self::Trainer),
            "admin" | "3" => Ok(Self::Admin),
            other => Err(AccessError::InvalidArgument(format!("invalid tier '{other}'"))),
        }
    }
}

/// A registered credential holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    /// Canonical credential token, e.g. `"04:A3:1F:7C"`.
    pub token: String,
    pub tier: Tier,
    /// `false` once soft-deleted.
    pub active: bool,
    pub created_at: u64,
    /// Seconds of the last granted scan, 0 if never.
    pub last_seen: u64,
}

impl Identity {
    /// Whether the identity has ever been granted access.
    pub fn has_been_seen(&self) -> bool {
        self.last_seen != 0
    }
}

/// Validate an identity name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AccessError::InvalidArgument("name is empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(AccessError::InvalidArgument(format!(
            "name is {} bytes, limit is {MAX_NAME_LEN}",
            name.len()
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AccessError::InvalidArgument(
            "name contains control characters".into(),
        ));
    }
    Ok(())
}
