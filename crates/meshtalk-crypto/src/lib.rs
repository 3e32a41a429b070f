//! # MESHTALK Crypto
//!
//! Cryptographic primitives for the MESHTALK direct-message protocol.
//!
//! This crate provides:
//! - A deterministic AES-256-CTR packet transform, keyed by a pairwise
//!   symmetric key and addressed by the packet header (spec §4.2).
//! - A symmetric key-derivation function for the two-message pair handshake
//!   (spec §4.3).
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Notes |
//! |----------|-----------|-------|
//! | Packet cipher | AES-256-CTR | deterministic counter block, no MAC |
//! | Key derivation | BLAKE3 (`derive_key`) | symmetric in the two peer addresses |
//! | Counter-block derivation | BLAKE3 (keyed) | commits `(from, to, nonce, msg_id)` |
//!
//! There is deliberately no AEAD tag: spec §4.2 defines the primitive as a
//! bare deterministic transform, and authenticity at the protocol layer
//! comes from possession of the pairwise key plus the monotonic replay
//! window (spec §4.3), not from a per-packet MAC.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cipher;
pub mod error;
pub mod kdf;

pub use cipher::{aes256_ctr_transform, KEY_SIZE, MAX_TEXT_LEN};
pub use error::CryptoError;
pub use kdf::derive_pair_key;
