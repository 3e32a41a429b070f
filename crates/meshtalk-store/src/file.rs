//! File-backed [`KvStore`](crate::KvStore).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{error::StoreError, KvStore};

/// A key/value store backed by a single file, bincode-serialized and
/// flushed to disk on every write.
///
/// Committing the whole namespace on every `put` (rather than batching)
/// mirrors the original firmware's per-call `Preferences` commit: each
/// setting write is its own durable transaction, since the device may lose
/// power at any point between writes.
pub struct FileKvStore {
    path: PathBuf,
    values: HashMap<String, Vec<u8>>,
}

impl FileKvStore {
    /// Open (or create) a store backed by `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => bincode::deserialize(&bytes)?,
            Ok(_) => HashMap::new(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(Self { path, values })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let bytes = bincode::serialize(&self.values)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for FileKvStore {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_vec());
        self.flush()?;
        tracing::debug!(key, len = value.len(), "store: put_bytes");
        Ok(())
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StoreError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StoreError::WrongWidth(key.to_string()))?;
                Ok(Some(u32::from_le_bytes(arr)))
            }
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), value.to_le_bytes().to_vec());
        self.flush()?;
        tracing::debug!(key, value, "store: put_u32");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        self.flush()?;
        tracing::debug!("store: cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.kv");

        {
            let mut store = FileKvStore::open(&path).unwrap();
            store.put_bytes("pair/3", &[1u8; 32]).unwrap();
            store.put_u32("rplay/3", 7).unwrap();
        }

        let store = FileKvStore::open(&path).unwrap();
        assert_eq!(store.get_bytes("pair/3").unwrap(), Some(vec![1u8; 32]));
        assert_eq!(store.get_u32("rplay/3").unwrap(), Some(7));
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.kv");
        let store = FileKvStore::open(&path).unwrap();
        assert_eq!(store.get_bytes("anything").unwrap(), None);
    }
}
