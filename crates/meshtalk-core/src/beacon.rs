//! Bounded list of observed pair-beacons (spec §4.4, §4.6).
//!
//! Distinct from [`crate::seen_peer::SeenPeerTable`]: only `Presence`
//! packets whose text begins with the literal `"PAIR_BEACON"` tag land
//! here, feeding the Listen-mode join list rather than the general
//! nearby-peers view.

/// Minimum capacity (spec §5).
pub const CAPACITY: usize = 6;

#[derive(Debug, Clone, Copy)]
struct Slot {
    active: bool,
    addr: u16,
    last_seen_sec: u32,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            active: false,
            addr: 0,
            last_seen_sec: 0,
        }
    }
}

/// Bounded, LRU-displacing list of addresses currently beaconing for pairing.
#[derive(Debug)]
pub struct BeaconList {
    slots: [Slot; CAPACITY],
}

impl Default for BeaconList {
    fn default() -> Self {
        Self::new()
    }
}

impl BeaconList {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); CAPACITY],
        }
    }

    /// Record a pair-beacon observed from `addr` at `now_sec`.
    pub fn note(&mut self, addr: u16, now_sec: u32) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.active && s.addr == addr) {
            slot.last_seen_sec = now_sec;
            return;
        }

        let victim = self
            .slots
            .iter_mut()
            .find(|s| !s.active)
            .or_else(|| self.slots.iter_mut().min_by_key(|s| s.last_seen_sec))
            .expect("table has nonzero capacity");

        *victim = Slot {
            active: true,
            addr,
            last_seen_sec: now_sec,
        };
    }

    /// Addresses currently beaconing, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.slots.iter().filter(|s| s.active).map(|s| s.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_lists_beacons() {
        let mut beacons = BeaconList::new();
        beacons.note(5, 10);
        beacons.note(6, 11);
        let mut addrs: Vec<u16> = beacons.iter().collect();
        addrs.sort_unstable();
        assert_eq!(addrs, vec![5, 6]);
    }

    #[test]
    fn evicts_least_recently_seen_past_capacity() {
        let mut beacons = BeaconList::new();
        for addr in 0..CAPACITY as u16 {
            beacons.note(addr, u32::from(addr));
        }
        beacons.note(CAPACITY as u16, 1000);
        let addrs: Vec<u16> = beacons.iter().collect();
        assert!(!addrs.contains(&0));
        assert!(addrs.contains(&(CAPACITY as u16)));
    }
}
