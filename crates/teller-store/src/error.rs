use thiserror::Error;

/// Errors that can occur in the call state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write the on-disk mirror.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a call record.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The call identifier is not usable as a file name.
    #[error("invalid call identifier: {0:?}")]
    InvalidCallId(String),
}
