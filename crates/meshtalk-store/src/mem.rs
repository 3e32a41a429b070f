//! In-memory [`KvStore`](crate::KvStore), for tests.

use std::collections::HashMap;

use crate::{error::StoreError, KvStore};

/// An in-memory key/value store with no persistence, for unit and
/// integration tests.
#[derive(Debug, Default)]
pub struct MemKvStore {
    values: HashMap<String, Vec<u8>>,
}

impl MemKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemKvStore {
    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_vec());
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
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_bytes_and_scalars() {
        let mut store = MemKvStore::new();
        assert_eq!(store.get_bytes("pair/7").unwrap(), None);
        store.put_bytes("pair/7", &[9u8; 32]).unwrap();
        assert_eq!(store.get_bytes("pair/7").unwrap(), Some(vec![9u8; 32]));

        store.put_u32("rplay/7", 42).unwrap();
        assert_eq!(store.get_u32("rplay/7").unwrap(), Some(42));
    }

    #[test]
    fn schema_version_sentinel() {
        let mut store = MemKvStore::new();
        assert!(!store.schema_is_current().unwrap());
        store.stamp_current_schema_version().unwrap();
        assert!(store.schema_is_current().unwrap());
    }
}
