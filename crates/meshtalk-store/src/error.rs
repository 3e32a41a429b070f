//! Persistent store error types.

use thiserror::Error;

/// Errors raised by a [`crate::KvStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk representation could not be decoded.
    #[error("store decode error: {0}")]
    Decode(#[from] bincode::Error),

    /// A value was read back with the wrong width for the accessor used.
    #[error("value for key {0:?} had the wrong width")]
    WrongWidth(String),
}
