//! Radio substrate error types.

use thiserror::Error;

/// Errors raised constructing or configuring a radio substrate.
///
/// Per-send failures are not modeled as errors: [`crate::handle::RadioHandle::send`]
/// returns a plain `bool`, matching spec §6.1 ("returns false if the
/// substrate refuses due to airtime/backpressure").
#[derive(Debug, Error)]
pub enum RadioError {
    /// A radio parameter was outside the range the substrate can represent.
    #[error("invalid radio parameter {name}: {value}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Value supplied.
        value: String,
    },
}
