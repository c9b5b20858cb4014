//! Credential tokens — the canonical string form of a card UID.
//!
//! Each UID byte becomes two uppercase hex digits, with a `:` between
//! bytes and none after the last: `[0x04, 0xa3, 0x1f]` → `"04:A3:1F"`.

use crate::error::{AccessError, Result};

/// Longest UID the reader driver delivers, in bytes.
pub const MAX_UID_LEN: usize = 10;

/// Longest token stored in a record, in bytes.
pub const MAX_TOKEN_LEN: usize = 31;

/// Convert raw UID bytes to the canonical token.
///
/// Pure formatting; length limits are enforced by [`crate::event::ScanEvent`].
pub fn uid_to_token(uid: &[u8]) -> String {
    uid.iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// Validate an administratively supplied token and return its canonical form.
///
/// Lowercase hex digits are accepted and upper-cased. Anything that is not
/// `HH(:HH)*`, or is longer than [`MAX_TOKEN_LEN`], is rejected.
pub fn canonicalize(token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AccessError::InvalidArgument("token is empty".into()));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(AccessError::InvalidArgument(format!(
            "token is {} bytes, limit is {MAX_TOKEN_LEN}",
            token.len()
        )));
    }

    let well_formed = token.split(':').all(|group| {
        group.len() == 2 && group.bytes().all(|b| b.is_ascii_hexdigit())
    });
    if !well_formed {
        return Err(AccessError::InvalidArgument(format!(
            "token '{token}' is not colon-separated hex bytes"
        )));
    }

    Ok(token.to_ascii_uppercase())
}

/// Parse a UID typed by an operator, with or without `:` separators.
pub fn parse_uid(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.trim().chars().filter(|c| *c != ':').collect();
    let bytes = hex::decode(&compact)
        .map_err(|e| AccessError::InvalidArgument(format!("UID '{input}' is not hex: {e}")))?;
    if bytes.is_empty() || bytes.len() > MAX_UID_LEN {
        return Err(AccessError::InvalidArgument(format!(
            "UID must be 1..={MAX_UID_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
