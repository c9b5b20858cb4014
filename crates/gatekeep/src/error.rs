//! Error types for gatekeep.
//!
//! Every fallible operation returns one of the five kinds below to its
//! immediate caller. Nothing is retried internally; durability is left
//! entirely to the backing store.

/// Error taxonomy shared by the record store, directory and pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// A field was malformed or out of range (bad tier, oversized name, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Another active identity already holds the credential token.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown identity id, or no active identity holds the token.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store failed to read, write, commit or decode a record.
    #[error("Store fault: {0}")]
    StoreFault(String),

    /// A grant listener reported its own failure.
    #[error("Listener failed: {0}")]
    Listener(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for AccessError {
    fn from(e: std::io::Error) -> Self {
        Self::StoreFault(format!("I/O error: {e}"))
    }
}

impl From<bincode::Error> for AccessError {
    fn from(e: bincode::Error) -> Self {
        Self::StoreFault(format!("record encoding error: {e}"))
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(e: serde_json::Error) -> Self {
        Self::StoreFault(format!("namespace file error: {e}"))
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, AccessError>;
