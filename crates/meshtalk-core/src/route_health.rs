//! Per-destination route freshness (spec §3, §4.5).

/// Minimum capacity (spec §5).
pub const CAPACITY: usize = 6;

/// How long, in milliseconds, a route stays "fresh" after an ACK or
/// discovery without needing a new discovery probe (spec §6.5).
pub const ROUTE_FRESHNESS_MS: u64 = 45_000;

/// Per-destination freshness tracking.
#[derive(Debug, Clone, Copy)]
pub struct RouteHealth {
    /// Destination address.
    pub dst: u16,
    /// Consecutive ACKed sends.
    pub success_streak: u32,
    /// Last time an ACK was received from this destination.
    pub last_ack_ms: u64,
    /// Last time a discovery probe touched this destination.
    pub last_discovery_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    active: bool,
    health: RouteHealth,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            active: false,
            health: RouteHealth {
                dst: 0,
                success_streak: 0,
                last_ack_ms: 0,
                last_discovery_ms: 0,
            },
        }
    }
}

/// Bounded table of per-destination route health.
#[derive(Debug)]
pub struct RouteHealthTable {
    slots: [Slot; CAPACITY],
}

impl Default for RouteHealthTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteHealthTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); CAPACITY],
        }
    }

    fn entry_mut(&mut self, dst: u16) -> &mut RouteHealth {
        if let Some(idx) = self
            .slots
            .iter()
            .position(|s| s.active && s.health.dst == dst)
        {
            return &mut self.slots[idx].health;
        }

        let victim_idx = self
            .slots
            .iter()
            .position(|s| !s.active)
            .unwrap_or_else(|| {
                self.slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| s.health.last_ack_ms.max(s.health.last_discovery_ms))
                    .map(|(idx, _)| idx)
                    .expect("table has nonzero capacity")
            });

        self.slots[victim_idx] = Slot {
            active: true,
            health: RouteHealth {
                dst,
                success_streak: 0,
                last_ack_ms: 0,
                last_discovery_ms: 0,
            },
        };
        &mut self.slots[victim_idx].health
    }

    /// Look up route health for `dst`, if tracked.
    #[must_use]
    pub fn get(&self, dst: u16) -> Option<&RouteHealth> {
        self.slots
            .iter()
            .find(|s| s.active && s.health.dst == dst)
            .map(|s| &s.health)
    }

    /// Record a successful ACK from `dst` at `now_ms`.
    pub fn note_success(&mut self, dst: u16, now_ms: u64) {
        let entry = self.entry_mut(dst);
        entry.success_streak += 1;
        entry.last_ack_ms = now_ms;
    }

    /// Record a discovery probe touching `dst` at `now_ms`.
    pub fn note_discovery(&mut self, dst: u16, now_ms: u64) {
        let entry = self.entry_mut(dst);
        entry.last_discovery_ms = now_ms;
    }

    /// True iff `dst` has no tracked route, or its freshest signal is older
    /// than [`ROUTE_FRESHNESS_MS`] (spec §4.5's `route_is_stale`).
    #[must_use]
    pub fn is_stale(&self, dst: u16, now_ms: u64) -> bool {
        match self.get(dst) {
            None => true,
            Some(health) => {
                let freshest = health.last_ack_ms.max(health.last_discovery_ms);
                now_ms.saturating_sub(freshest) > ROUTE_FRESHNESS_MS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_destination_is_stale() {
        let table = RouteHealthTable::new();
        assert!(table.is_stale(1, 1_000));
    }

    #[test]
    fn freshens_on_ack_and_discovery() {
        let mut table = RouteHealthTable::new();
        table.note_success(1, 10_000);
        assert!(!table.is_stale(1, 10_000 + ROUTE_FRESHNESS_MS));
        assert!(table.is_stale(1, 10_000 + ROUTE_FRESHNESS_MS + 1));

        table.note_discovery(1, 20_000);
        assert!(!table.is_stale(1, 20_000 + ROUTE_FRESHNESS_MS));
    }

    #[test]
    fn success_streak_accumulates() {
        let mut table = RouteHealthTable::new();
        table.note_success(1, 0);
        table.note_success(1, 100);
        assert_eq!(table.get(1).unwrap().success_streak, 2);
    }
}
