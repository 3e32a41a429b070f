//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key was structurally invalid (wrong length for the cipher).
    #[error("invalid key: expected {expected} bytes, got {actual}")]
    InvalidKey {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        actual: usize,
    },

    /// Input and output buffers did not match in length.
    #[error("buffer length mismatch: input {input}, output {output}")]
    BufferMismatch {
        /// Input buffer length.
        input: usize,
        /// Output buffer length.
        output: usize,
    },

    /// Payload exceeds the 96-byte text cap (spec §1, §3).
    #[error("payload too large: {0} bytes exceeds the 96-byte cap")]
    PayloadTooLarge(usize),
}
