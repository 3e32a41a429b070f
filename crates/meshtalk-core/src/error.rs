//! Core protocol error types.
//!
//! Per spec §7's propagation rule, almost nothing in this table reaches a
//! caller: `RadioBusy`, `NoKey`, `ReplayRejected`, `DecryptFailed`,
//! `Duplicate`, and `HandshakeMismatch` are absorbed as `tracing` events by
//! the RX demux and retry machine. A pending send that exhausts its retry
//! budget without an ACK is not an error either: the give-up path marks the
//! chat-log entry failed instead of returning a `Result`. Only
//! [`Error::NoPendingSlot`] is surfaced to the compose entry point.

use thiserror::Error;

/// Errors surfaced by the compose entry point (spec §7).
#[derive(Debug, Error)]
pub enum Error {
    /// All pending-send slots are occupied.
    #[error("no free pending-send slot (capacity {capacity})")]
    NoPendingSlot {
        /// Configured pending-slot capacity.
        capacity: usize,
    },

    /// Wire packet failed to parse.
    #[error("packet decode error: {0}")]
    Packet(#[from] crate::packet::PacketError),

    /// Underlying cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] meshtalk_crypto::CryptoError),

    /// Underlying persistent store operation failed.
    #[error("store error: {0}")]
    Store(#[from] meshtalk_store::StoreError),
}

/// Convenience alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
