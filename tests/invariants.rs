//! Protocol-wide invariants checked against live [`Node`] pairs and the
//! dedupe window in isolation: at-most-once delivery, an ack per accepted
//! chat (duplicates included), bounded retry budgets, symmetric pairwise
//! keys, the send gate, and the airtime deferral floor.

use proptest::prelude::*;

use meshtalk_core::{DedupeWindow, PacketKind, TimingParams, WireChatPacket, WIRE_PACKET_SIZE};
use meshtalk_integration_tests::{chat_log_contains, chat_log_delivered, chat_log_failed, TwoNodeHarness, ADDR_A, ADDR_B};

#[tokio::test]
async fn every_accepted_chat_produces_exactly_one_ack_even_on_duplicate_delivery() {
    let mut harness = TwoNodeHarness::new();
    let mut pkt = WireChatPacket::new(PacketKind::Chat, ADDR_A, ADDR_B);
    pkt.msg_id = 42;
    pkt.set_text(b"ping").unwrap();
    let bytes = pkt.encode();

    harness.node_b.on_rx(ADDR_A, &bytes, -40, 8.0, 0, 0);
    let ack_one = harness.radio_a.wait_for_packet().await.unwrap();
    let decoded_one = WireChatPacket::decode(&ack_one.bytes).unwrap();
    assert_eq!(decoded_one.kind, PacketKind::Ack);
    assert_eq!(decoded_one.ref_msg_id, 42);

    harness.node_b.on_rx(ADDR_A, &bytes, -40, 8.0, 0, 0);
    let ack_two = harness.radio_a.wait_for_packet().await.unwrap();
    assert_eq!(WireChatPacket::decode(&ack_two.bytes).unwrap().kind, PacketKind::Ack);

    assert_eq!(harness.node_b.chat_log().size(), 1, "a duplicate delivery must not append a second entry");
}

#[tokio::test]
async fn paired_keys_are_symmetric_in_both_directions() {
    let mut harness = TwoNodeHarness::new();
    harness.pair_up().await;

    harness.node_a.send_draft(ADDR_B, "from a", harness.now_ms(), harness.now_sec()).unwrap();
    harness.node_b.send_draft(ADDR_A, "from b", harness.now_ms(), harness.now_sec()).unwrap();

    let delivered = harness
        .run_until(100, 200, |h| {
            chat_log_contains(h.node_b.chat_log(), "from a") && chat_log_contains(h.node_a.chat_log(), "from b")
        })
        .await;
    assert!(delivered, "a message encrypted under the handshake-derived key must decrypt on both sides");
}

#[tokio::test]
async fn pending_slot_frees_within_the_bounded_retry_budget() {
    let mut harness = TwoNodeHarness::new();
    harness.pair_up().await;

    // B is never drained: no ack can ever clear the slot, so the pending
    // sender must give up and mark the message failed once its attempt
    // budget is spent, rather than retrying forever.
    harness
        .node_a
        .send_draft(ADDR_B, "into the void", harness.now_ms(), harness.now_sec())
        .unwrap();

    let timing = TimingParams::default();
    let bound_ms = u64::from(timing.max_total_attempts)
        * (timing.retry_base_ms * u64::from(timing.max_total_attempts) + timing.jitter_window_ms);

    let mut elapsed = 0u64;
    while elapsed < bound_ms && !chat_log_failed(harness.node_a.chat_log(), "into the void") {
        harness.clock.advance(500);
        elapsed += 500;
        harness.node_a.tick(harness.now_ms(), harness.now_sec());
    }
    assert!(
        chat_log_failed(harness.node_a.chat_log(), "into the void"),
        "pending slot was not freed within the bounded retry budget"
    );
}

#[tokio::test]
async fn tick_never_resends_before_its_own_next_send_gate() {
    let mut harness = TwoNodeHarness::new();
    harness.pair_up().await;
    harness
        .node_a
        .send_draft(ADDR_B, "hold on", harness.now_ms(), harness.now_sec())
        .unwrap();

    let tx_after_enqueue = harness.radio_a.tx_count();
    for _ in 0..5 {
        harness.node_a.tick(harness.now_ms(), harness.now_sec());
    }
    assert_eq!(
        harness.radio_a.tx_count(),
        tx_after_enqueue,
        "ticking without advancing the clock must not re-send before next_send_ms"
    );
}

#[tokio::test]
async fn airtime_refusal_defers_at_least_the_deferral_floor() {
    let mut harness = TwoNodeHarness::new();
    harness.pair_up().await;
    harness
        .node_a
        .send_draft(ADDR_B, "hello", harness.now_ms(), harness.now_sec())
        .unwrap();

    let timing = TimingParams::default();
    harness.clock.advance(timing.retry_base_ms + timing.jitter_window_ms);

    // Saturate the radio right as the retry gate opens, so the retry
    // attempt itself (not the original send) is the one refused.
    assert!(harness.radio_a.send(ADDR_B, &[0u8; WIRE_PACKET_SIZE]));
    let tx_before = harness.radio_a.tx_count();

    harness.node_a.tick(harness.now_ms(), harness.now_sec());
    assert_eq!(harness.radio_a.tx_count(), tx_before, "the retry attempt should have been refused while busy");

    harness.clock.advance(timing.airtime_deferral_floor_ms / 2);
    harness.node_a.tick(harness.now_ms(), harness.now_sec());
    assert_eq!(harness.radio_a.tx_count(), tx_before, "must not retry before the airtime deferral floor elapses");

    harness.clock.advance(timing.airtime_deferral_floor_ms);
    harness.node_a.tick(harness.now_ms(), harness.now_sec());
    assert!(harness.radio_a.tx_count() > tx_before, "retry should fire once the floor has elapsed");
}

proptest! {
    /// A dedupe window only ever recognizes the most recent `CAPACITY`
    /// distinct insertions as seen, regardless of how they're interleaved.
    #[test]
    fn dedupe_window_only_remembers_the_last_capacity_insertions(ids in proptest::collection::vec(0u32..500, 1..80)) {
        let mut window = DedupeWindow::new();
        for &id in &ids {
            window.remember(7, id);
        }

        let capacity = meshtalk_core::dedupe::CAPACITY;
        let tail_start = ids.len().saturating_sub(capacity);
        for &id in &ids[tail_start..] {
            prop_assert!(window.seen(7, id));
        }
    }
}
