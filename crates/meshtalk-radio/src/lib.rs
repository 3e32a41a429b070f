//! # MESHTALK Radio
//!
//! The radio substrate abstraction consumed by the core protocol (spec
//! §6.1), plus a clock capability (spec §9's "Time source") and an
//! in-memory [`loopback::LoopbackRadio`] implementation used by tests and
//! the demo CLI.
//!
//! A real LoRa/driver-backed implementation is out of scope for this crate
//! (spec §1's "physical-layer radio driver" exclusion) and would live
//! behind the same [`handle::RadioHandle`] trait in a separate crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod handle;
pub mod loopback;
pub mod time_on_air;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RadioError;
pub use handle::{RadioHandle, RxRecord};
pub use loopback::{LoopbackRadio, RadioProfile, BROADCAST_ADDR};
pub use time_on_air::time_on_air_us;
