//! # MESHTALK Store
//!
//! A tiny typed key/value store (spec §6.3) used to persist pairwise keys
//! and the per-peer replay watermark across reboots. The Rust-native
//! equivalent of the original firmware's ESP32 `Preferences` namespace: a
//! flat key space, typed scalar and byte-array accessors, and a
//! schema-version sentinel that invalidates stored state across
//! incompatible layout changes rather than trying to migrate it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod file;
mod mem;

pub use error::StoreError;
pub use file::FileKvStore;
pub use mem::MemKvStore;

/// Key under which the schema-version sentinel is stored.
pub const SCHEMA_VERSION_KEY: &str = "schema/version";

/// Current schema version written by this crate.
///
/// A store opened with a different stored version is treated as empty
/// (spec's original: `storage_SettingsStore.cpp` ignores stored values on
/// version mismatch rather than attempting to migrate them).
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A typed key/value namespace for node state (spec §6.3).
///
/// Keys used by the core protocol: `pair/{peer}` → 32-byte pairwise key,
/// `rplay/{peer}` → last-observed secure `msg_id`.
pub trait KvStore: Send + Sync {
    /// Read a byte-array value.
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a byte-array value.
    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Read a scalar `u32` value.
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StoreError>;

    /// Write a scalar `u32` value.
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StoreError>;

    /// Read the schema-version sentinel, if ever written.
    fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        self.get_u32(SCHEMA_VERSION_KEY)
    }

    /// Stamp the schema-version sentinel to [`CURRENT_SCHEMA_VERSION`].
    fn stamp_current_schema_version(&mut self) -> Result<(), StoreError> {
        self.put_u32(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION)
    }

    /// True iff the stored schema version matches [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Callers should treat a `false` result the same as an empty store:
    /// read nothing, then stamp the current version before writing anything
    /// new.
    fn schema_is_current(&self) -> Result<bool, StoreError> {
        Ok(self.schema_version()? == Some(CURRENT_SCHEMA_VERSION))
    }

    /// Wipe every stored key. Used when [`schema_is_current`](Self::schema_is_current)
    /// is `false`: stale-schema state is discarded outright rather than migrated.
    fn clear(&mut self) -> Result<(), StoreError>;
}
