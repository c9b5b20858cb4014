//! Record encoding.
//!
//! A stored record is laid out as:
//!
//! ```text
//! [format version: u8][bincode payload][checksum: 4 bytes]
//! ```
//!
//! The payload uses bincode's fixed-width integer encoding with a hard size
//! limit, and the checksum is the first four bytes of SHA-256 over the version
//! byte and payload. A torn write or a worn flash page therefore decodes as
//! an error instead of as a plausible-looking record.
//!
//! Counters are plain 4-byte little-endian `u32` values with no framing.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{AccessError, Result};

/// Current record format version.
pub const RECORD_FORMAT_VERSION: u8 = 1;

/// Upper bound on an encoded payload; bounded text fields keep records far below it.
pub const MAX_PAYLOAD_LEN: u64 = 256;

const CHECKSUM_LEN: usize = 4;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_PAYLOAD_LEN)
}

fn checksum(framed: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(framed);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode a record for storage.
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let payload = options().serialize(record)?;
    let mut blob = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    blob.push(RECORD_FORMAT_VERSION);
    blob.extend_from_slice(&payload);
    let sum = checksum(&blob);
    blob.extend_from_slice(&sum);
    Ok(blob)
}

/// Decode a stored record, verifying version and checksum.
pub fn decode_record<T: DeserializeOwned>(blob: &[u8]) -> Result<T> {
    if blob.len() < 1 + CHECKSUM_LEN {
        return Err(AccessError::StoreFault(format!(
            "record truncated to {} bytes",
            blob.len()
        )));
    }

    let (framed, stored_sum) = blob.split_at(blob.len() - CHECKSUM_LEN);
    if checksum(framed) != stored_sum {
        return Err(AccessError::StoreFault("record checksum mismatch".into()));
    }
    if framed[0] != RECORD_FORMAT_VERSION {
        return Err(AccessError::StoreFault(format!(
            "unsupported record version {}",
            framed[0]
        )));
    }

    Ok(options().deserialize(&framed[1..])?)
}

/// Encode a counter value.
pub fn encode_counter(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode a counter value.
pub fn decode_counter(key: &str, blob: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = blob.try_into().map_err(|_| {
        AccessError::StoreFault(format!(
            "counter '{key}' holds {} bytes, expected 4",
            blob.len()
        ))
    })?;
    Ok(u32::from_le_bytes(bytes))
}
