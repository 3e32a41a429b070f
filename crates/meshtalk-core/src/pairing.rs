//! Pairing store and the two-message pair handshake (spec §4.3).
//!
//! Keys and the replay watermark are persistent (backed by a
//! [`meshtalk_store::KvStore`]); outstanding outgoing requests are volatile
//! and bounded (spec §5's 4-slot cap).

use meshtalk_crypto::{derive_pair_key, KEY_SIZE};
use meshtalk_store::KvStore;

use crate::error::Result;

/// Minimum outstanding-request capacity (spec §5).
pub const OUTSTANDING_CAPACITY: usize = 4;

fn pair_key_name(peer: u16) -> String {
    format!("pair/{peer}")
}

fn replay_key_name(peer: u16) -> String {
    format!("rplay/{peer}")
}

#[derive(Debug, Clone, Copy)]
struct OutstandingRequest {
    active: bool,
    peer: u16,
    local_msg_id: u32,
    local_nonce: u32,
}

impl Default for OutstandingRequest {
    fn default() -> Self {
        Self {
            active: false,
            peer: 0,
            local_msg_id: 0,
            local_nonce: 0,
        }
    }
}

/// Persistent peer-key map, volatile outstanding-request list, and
/// persistent per-peer replay watermark.
pub struct PairingStore {
    store: Box<dyn KvStore>,
    local_addr: u16,
    outstanding: [OutstandingRequest; OUTSTANDING_CAPACITY],
}

impl PairingStore {
    /// Build a pairing store over `store`, owned by the node at `local_addr`.
    ///
    /// A store written by an incompatible schema version is wiped rather
    /// than trusted (spec §2, mirroring the original firmware's
    /// `storage_SettingsStore.cpp`, which ignores stored values on version
    /// mismatch): a stale pairwise key or replay watermark read under a
    /// layout it wasn't written for is worse than having none at all.
    #[must_use]
    pub fn new(mut store: Box<dyn KvStore>, local_addr: u16) -> Self {
        match store.schema_is_current() {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("pairing: store schema stale, discarding");
                if let Err(err) = store.clear() {
                    tracing::warn!(%err, "pairing: failed to clear stale-schema store");
                }
                if let Err(err) = store.stamp_current_schema_version() {
                    tracing::warn!(%err, "pairing: failed to stamp schema version");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "pairing: failed to read schema version");
            }
        }

        Self {
            store,
            local_addr,
            outstanding: [OutstandingRequest::default(); OUTSTANDING_CAPACITY],
        }
    }

    /// True iff a symmetric key is already stored for `peer`.
    #[must_use]
    pub fn has_key(&self, peer: u16) -> bool {
        matches!(self.store.get_bytes(&pair_key_name(peer)), Ok(Some(bytes)) if bytes.len() == KEY_SIZE)
    }

    /// Load the symmetric key stored for `peer`, if any.
    pub fn load_key(&self, peer: u16) -> Result<Option<[u8; KEY_SIZE]>> {
        match self.store.get_bytes(&pair_key_name(peer))? {
            Some(bytes) if bytes.len() == KEY_SIZE => {
                let mut key = [0u8; KEY_SIZE];
                key.copy_from_slice(&bytes);
                Ok(Some(key))
            }
            _ => Ok(None),
        }
    }

    fn store_key(&mut self, peer: u16, key: &[u8; KEY_SIZE]) -> Result<()> {
        self.store.put_bytes(&pair_key_name(peer), key)?;
        tracing::info!(peer, "pairing: key stored");
        Ok(())
    }

    /// Record an outstanding outgoing `PairRequest`, insert-or-replace by peer.
    pub fn record_outgoing_request(&mut self, peer: u16, msg_id: u32, nonce: u32) {
        let idx = self
            .outstanding
            .iter()
            .position(|s| s.active && s.peer == peer)
            .or_else(|| self.outstanding.iter().position(|s| !s.active))
            .unwrap_or(0);

        self.outstanding[idx] = OutstandingRequest {
            active: true,
            peer,
            local_msg_id: msg_id,
            local_nonce: nonce,
        };
    }

    /// Acceptor path: derive a key from an inbound `PairRequest` and store it.
    ///
    /// A duplicate `PairRequest` from an already-paired peer reuses the
    /// stored key and does not re-derive (spec §9's resolved Open Question,
    /// option (a)): already-delivered secure messages must remain
    /// verifiable under the key that encrypted them.
    pub fn derive_from_request(
        &mut self,
        peer: u16,
        req_msg_id: u32,
        req_nonce: u32,
        accept_nonce: u32,
    ) -> Result<[u8; KEY_SIZE]> {
        if let Some(existing) = self.load_key(peer)? {
            tracing::debug!(peer, "pairing: duplicate PairRequest, reusing stored key");
            return Ok(existing);
        }
        let key = derive_pair_key(self.local_addr, peer, req_msg_id, req_nonce, accept_nonce);
        self.store_key(peer, &key)?;
        Ok(key)
    }

    /// Initiator path: resolve a `PairAccept` against an outstanding request.
    ///
    /// Returns `None` if `ref_msg_id` matches no outstanding record (spec
    /// §7's `HandshakeMismatch`, dropped silently by the caller).
    pub fn resolve_pending_request(
        &mut self,
        peer: u16,
        ref_msg_id: u32,
        accept_nonce: u32,
    ) -> Result<Option<[u8; KEY_SIZE]>> {
        let Some(idx) = self
            .outstanding
            .iter()
            .position(|s| s.active && s.peer == peer && s.local_msg_id == ref_msg_id)
        else {
            return Ok(None);
        };
        let req = self.outstanding[idx];
        let key = derive_pair_key(self.local_addr, peer, req.local_msg_id, req.local_nonce, accept_nonce);
        self.store_key(peer, &key)?;
        self.outstanding[idx] = OutstandingRequest::default();
        Ok(Some(key))
    }

    /// Replay check: accept iff `msg_id` is strictly greater than the
    /// stored watermark for `peer`, then advance the watermark.
    pub fn check_replay_and_update(&mut self, peer: u16, msg_id: u32) -> Result<bool> {
        let last = self.store.get_u32(&replay_key_name(peer))?.unwrap_or(0);
        if msg_id <= last {
            return Ok(false);
        }
        self.store.put_u32(&replay_key_name(peer), msg_id)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtalk_store::MemKvStore;

    fn store() -> Box<dyn KvStore> {
        Box::new(MemKvStore::new())
    }

    #[test]
    fn handshake_produces_symmetric_keys() {
        let mut a = PairingStore::new(store(), 10);
        let mut b = PairingStore::new(store(), 20);

        a.record_outgoing_request(20, 5, 111);
        let k_b = b.derive_from_request(10, 5, 111, 222).unwrap();
        let k_a = a.resolve_pending_request(20, 5, 222).unwrap().unwrap();

        assert_eq!(k_a, k_b);
        assert!(a.has_key(20));
        assert!(b.has_key(10));
    }

    #[test]
    fn duplicate_pair_request_reuses_stored_key() {
        let mut b = PairingStore::new(store(), 20);
        let k1 = b.derive_from_request(10, 5, 111, 222).unwrap();
        let k2 = b.derive_from_request(10, 5, 111, 999).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn resolve_with_no_outstanding_request_is_none() {
        let mut a = PairingStore::new(store(), 10);
        assert!(a.resolve_pending_request(20, 5, 222).unwrap().is_none());
    }

    #[test]
    fn replay_watermark_is_strictly_monotonic() {
        let mut b = PairingStore::new(store(), 20);
        assert!(b.check_replay_and_update(10, 50).unwrap());
        assert!(!b.check_replay_and_update(10, 50).unwrap());
        assert!(!b.check_replay_and_update(10, 49).unwrap());
        assert!(b.check_replay_and_update(10, 51).unwrap());
    }

    #[test]
    fn stale_schema_store_is_discarded_on_open() {
        let mut raw = MemKvStore::new();
        raw.put_bytes(&pair_key_name(20), &[7u8; 32]).unwrap();
        raw.put_u32(meshtalk_store::SCHEMA_VERSION_KEY, 0).unwrap();

        let a = PairingStore::new(Box::new(raw), 10);
        assert!(!a.has_key(20), "a key written under a stale schema must not survive");
    }
}
