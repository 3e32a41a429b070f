//! Reliable sender / pending-send queue (spec §4.5, §4.8).
//!
//! The largest single component by design weight: drives retries,
//! discovery escalation, and airtime-aware backoff for up to
//! [`CAPACITY`] in-flight outbound messages. `tick` is meant to be called
//! on every main-loop iteration; it is the sole timeout authority (spec
//! §5) — there is no wall-clock deadline beyond the attempt caps.

use meshtalk_radio::RadioHandle;

use crate::chatlog::ChatLog;
use crate::config::TimingParams;
use crate::ids::MsgIdGen;
use crate::packet::{PacketKind, WireChatPacket, BROADCAST_ADDR};
use crate::route_health::RouteHealthTable;

/// Minimum pending-slot capacity (spec §5).
pub const CAPACITY: usize = 4;

/// Minimum time since last send before a stale route triggers discovery
/// escalation (spec §4.5, step 1).
const STALE_ROUTE_PROBE_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone)]
struct PendingSlot {
    active: bool,
    dst: u16,
    attempts: u8,
    discovery_sent: bool,
    last_send_ms: u64,
    next_send_ms: u64,
    pkt: Option<WireChatPacket>,
}

impl Default for PendingSlot {
    fn default() -> Self {
        Self {
            active: false,
            dst: 0,
            attempts: 0,
            discovery_sent: false,
            last_send_ms: 0,
            next_send_ms: 0,
            pkt: None,
        }
    }
}

/// `retry_delay(attempt) = RETRY_BASE_MS * attempt + jitter`, jitter drawn
/// from `[0, JITTER_WINDOW_MS)` so simultaneous retries from different
/// nodes do not collide in lockstep (spec §4.5).
pub(crate) fn retry_delay_ms(attempt: u8, timing: &TimingParams) -> u64 {
    use rand::Rng;
    let jitter = rand::thread_rng().gen_range(0..timing.jitter_window_ms.max(1));
    timing.retry_base_ms * u64::from(attempt) + jitter
}

/// Fixed-slot table of in-flight outbound messages.
pub struct PendingTable {
    slots: [PendingSlot; CAPACITY],
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| PendingSlot::default()),
        }
    }

    /// Enqueue `pkt` for reliable delivery to `dst`. Returns `false` if all
    /// [`CAPACITY`] slots are occupied (spec §7's `NoPendingSlot`).
    pub fn enqueue(&mut self, dst: u16, pkt: WireChatPacket, attempts: u8, next_send_ms: u64, now_ms: u64) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| !s.active) else {
            return false;
        };
        *slot = PendingSlot {
            active: true,
            dst,
            attempts,
            discovery_sent: false,
            last_send_ms: if attempts > 0 { now_ms } else { 0 },
            next_send_ms,
            pkt: Some(pkt),
        };
        true
    }

    /// True iff every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.active)
    }

    /// Clear the slot whose packet has `msg_id`, if any (spec: "a
    /// successful Ack clears the slot (idempotent across the cap
    /// checks)"). Returns the cleared slot's destination.
    pub fn clear_by_msg_id(&mut self, msg_id: u32) -> Option<u16> {
        let slot = self.slots.iter_mut().find(|s| {
            s.active
                && s.pkt
                    .as_ref()
                    .is_some_and(|p| p.msg_id == msg_id)
        })?;
        let dst = slot.dst;
        *slot = PendingSlot::default();
        Some(dst)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Drive retries, discovery escalation, and airtime backoff for every
    /// active slot (spec §4.5's tick algorithm, rules 1-5, evaluated in
    /// order per slot).
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        now_ms: u64,
        radio: &dyn RadioHandle,
        route_health: &mut RouteHealthTable,
        chat_log: &mut ChatLog,
        ids: &mut MsgIdGen,
        local_addr: u16,
        timing: &TimingParams,
    ) {
        for slot in &mut self.slots {
            if !slot.active {
                continue;
            }
            let Some(pkt) = slot.pkt.as_ref() else {
                continue;
            };
            let original_msg_id = pkt.msg_id;

            // Rule 1: stale-route discovery escalation.
            if !slot.discovery_sent
                && slot.attempts > 0
                && now_ms.saturating_sub(slot.last_send_ms) >= STALE_ROUTE_PROBE_DELAY_MS
                && route_health.is_stale(slot.dst, now_ms)
            {
                emit_discovery(radio, route_health, ids, local_addr, slot.dst, original_msg_id, now_ms);
                slot.discovery_sent = true;
                slot.next_send_ms = now_ms + timing.discovery_cooldown_ms;
                continue;
            }

            // Rule 2: unicast attempt cap -> escalate to discovery instead of retrying unicast.
            if slot.attempts >= timing.max_unicast_attempts && !slot.discovery_sent {
                if now_ms >= slot.next_send_ms {
                    let sent = emit_discovery(
                        radio,
                        route_health,
                        ids,
                        local_addr,
                        slot.dst,
                        original_msg_id,
                        now_ms,
                    );
                    if sent {
                        slot.discovery_sent = true;
                        slot.next_send_ms = now_ms + timing.discovery_cooldown_ms;
                    }
                }
                continue;
            }

            // Rule 3: total attempt cap -> give up.
            if slot.attempts >= timing.max_total_attempts {
                if now_ms >= slot.next_send_ms {
                    chat_log.mark_failed(original_msg_id);
                    tracing::warn!(dst = slot.dst, msg_id = original_msg_id, "pending: retry budget exhausted");
                    *slot = PendingSlot::default();
                }
                continue;
            }

            // Rule 4: gate.
            if now_ms < slot.next_send_ms {
                continue;
            }

            // Rule 5: send.
            let bytes = pkt.encode();
            if radio.send(slot.dst, &bytes) {
                slot.attempts += 1;
                slot.last_send_ms = now_ms;
                slot.next_send_ms = now_ms + retry_delay_ms(slot.attempts, timing);
                tracing::debug!(dst = slot.dst, msg_id = original_msg_id, attempts = slot.attempts, "pending: sent");
            } else {
                let backoff = u64::from(radio.airtime_remaining_ms(now_ms)).max(timing.airtime_deferral_floor_ms);
                slot.next_send_ms = now_ms + backoff;
                tracing::debug!(dst = slot.dst, msg_id = original_msg_id, backoff, "pending: airtime refused");
            }
        }
    }
}

/// Broadcast a `Discovery` probe reviving the route to `dst`, carrying
/// `revive_msg_id` in `ref_msg_id` so a reply `Ack` (spec §4.4's
/// `Ack{ref=pkt.ref_msg_id}`) clears the original pending slot directly.
fn emit_discovery(
    radio: &dyn RadioHandle,
    route_health: &mut RouteHealthTable,
    ids: &mut MsgIdGen,
    local_addr: u16,
    dst: u16,
    revive_msg_id: u32,
    now_ms: u64,
) -> bool {
    let mut pkt = WireChatPacket::new(PacketKind::Discovery, local_addr, BROADCAST_ADDR);
    pkt.msg_id = ids.next_id();
    pkt.ref_msg_id = revive_msg_id;
    let bytes = pkt.encode();
    let sent = radio.send(BROADCAST_ADDR, &bytes);
    if sent {
        route_health.note_discovery(dst, now_ms);
        tracing::info!(dst, revive_msg_id, "pending: discovery escalation");
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatlog::ChatLog;
    use crate::route_health::RouteHealthTable;
    use meshtalk_radio::{ManualClock, LoopbackRadio, RadioProfile};
    use std::sync::Arc;

    fn secure_chat(from: u16, to: u16, msg_id: u32) -> WireChatPacket {
        let mut pkt = WireChatPacket::new(PacketKind::SecureChat, from, to);
        pkt.msg_id = msg_id;
        pkt.set_text(b"hi").unwrap();
        pkt
    }

    #[tokio::test]
    async fn send_then_retry_backs_off_with_jitter() {
        // Seed route health as already fresh so the stale-route escalation
        // (rule 1) doesn't preempt the plain unicast retry under test.
        let clock = Arc::new(ManualClock::new(0));
        let (radio_a, _radio_b) = LoopbackRadio::pair(1, 2, RadioProfile::default(), clock.clone());
        let mut table = PendingTable::new();
        let mut route_health = RouteHealthTable::new();
        route_health.note_success(2, clock.now_ms());
        let mut chat_log = ChatLog::new();
        let mut ids = MsgIdGen::new();
        let timing = TimingParams::default();

        assert!(table.enqueue(2, secure_chat(1, 2, 10), 0, 0, clock.now_ms()));
        table.tick(clock.now_ms(), radio_a.as_ref(), &mut route_health, &mut chat_log, &mut ids, 1, &timing);
        assert_eq!(table.active_count(), 1);

        clock.advance(timing.retry_base_ms + timing.jitter_window_ms);
        table.tick(clock.now_ms(), radio_a.as_ref(), &mut route_health, &mut chat_log, &mut ids, 1, &timing);
        assert_eq!(radio_a.tx_count(), 2);
    }

    #[tokio::test]
    async fn stale_unestablished_route_escalates_to_discovery_early() {
        // No prior ack/discovery for dst 2: route_is_stale is true from the
        // start, so rule 1 fires on the very first retry rather than
        // waiting for the unicast-attempt cap.
        let clock = Arc::new(ManualClock::new(0));
        let (radio_a, radio_b) = LoopbackRadio::pair(1, 2, RadioProfile::default(), clock.clone());
        let mut table = PendingTable::new();
        let mut route_health = RouteHealthTable::new();
        let mut chat_log = ChatLog::new();
        let mut ids = MsgIdGen::new();
        let timing = TimingParams::default();

        table.enqueue(2, secure_chat(1, 2, 10), 0, 0, clock.now_ms());
        table.tick(clock.now_ms(), radio_a.as_ref(), &mut route_health, &mut chat_log, &mut ids, 1, &timing);

        clock.advance(timing.retry_base_ms + timing.jitter_window_ms);
        table.tick(clock.now_ms(), radio_a.as_ref(), &mut route_health, &mut chat_log, &mut ids, 1, &timing);

        // Second transmission should be the broadcast Discovery, not a unicast retry.
        let _first = radio_b.wait_for_packet().await; // the original SecureChat
        let record = radio_b.wait_for_packet().await.unwrap();
        let pkt = WireChatPacket::decode(&record.bytes).unwrap();
        assert_eq!(pkt.kind, PacketKind::Discovery);
        assert_eq!(pkt.ref_msg_id, 10);
    }

    #[tokio::test]
    async fn exhausting_retries_marks_failed_and_frees_slot() {
        let clock = Arc::new(ManualClock::new(0));
        let (radio_a, _radio_b) = LoopbackRadio::pair(1, 2, RadioProfile::default(), clock.clone());
        let mut table = PendingTable::new();
        let mut route_health = RouteHealthTable::new();
        let mut chat_log = ChatLog::new();
        let mut ids = MsgIdGen::new();
        let timing = TimingParams::default();

        chat_log.add(2, true, 10, "hi", 0);
        table.enqueue(2, secure_chat(1, 2, 10), 0, 0, clock.now_ms());

        for _ in 0..40 {
            table.tick(clock.now_ms(), radio_a.as_ref(), &mut route_health, &mut chat_log, &mut ids, 1, &timing);
            if table.active_count() == 0 {
                break;
            }
            clock.advance(1_500);
        }

        assert_eq!(table.active_count(), 0);
        assert!(chat_log.at(0).unwrap().failed);
    }

    #[test]
    fn clear_by_msg_id_frees_the_matching_slot() {
        let mut table = PendingTable::new();
        table.enqueue(2, secure_chat(1, 2, 10), 1, 0, 0);
        assert_eq!(table.clear_by_msg_id(10), Some(2));
        assert_eq!(table.active_count(), 0);
        assert_eq!(table.clear_by_msg_id(10), None);
    }

    #[test]
    fn enqueue_fails_when_full() {
        let mut table = PendingTable::new();
        for i in 0..CAPACITY as u32 {
            assert!(table.enqueue(2, secure_chat(1, 2, i), 0, 0, 0));
        }
        assert!(!table.enqueue(2, secure_chat(1, 2, 999), 0, 0, 0));
        assert!(table.is_full());
    }
}
