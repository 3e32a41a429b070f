//! Node orchestration (spec §4.4, §4.6, §4.7): owns every mutable table and
//! drives the RX demux, the reliable sender's tick, and the presence/beacon
//! engine.
//!
//! Single-threaded by design (spec §5): all of `on_rx`/`tick`/`send_draft`
//! are `&mut self` and meant to run on one main loop. The receive worker
//! that blocks on [`RadioHandle::wait_for_packet`] lives above this type
//! (in the CLI binary) and hands decoded records to `on_rx` over a channel,
//! mirroring the teacher's `packet_receive_loop` / main-loop split but
//! without `wraith-core`'s per-packet `tokio::task` spawn and `DashMap`
//! sharing (see crate docs for the rationale).

use std::sync::Arc;

use meshtalk_radio::RadioHandle;
use meshtalk_store::KvStore;

use crate::beacon::BeaconList;
use crate::chatlog::ChatLog;
use crate::config::{NodeConfig, PairingMode};
use crate::dedupe::DedupeWindow;
use crate::error::Result;
use crate::ids::MsgIdGen;
use crate::packet::{PacketKind, WireChatPacket, BROADCAST_ADDR, MAX_TEXT_LEN};
use crate::pairing::PairingStore;
use crate::pending::{self, PendingTable};
use crate::route_health::RouteHealthTable;
use crate::seen_peer::SeenPeerTable;

/// The short tag a general `Presence` broadcast carries (anything not
/// prefixed `PAIR_BEACON` is a general presence, spec §4.4/§4.6).
const PRESENCE_TAG: &[u8] = b"meshtalk";

/// The well-known pair-beacon marker (spec §4.6, §9).
const PAIR_BEACON_TAG: &[u8] = b"PAIR_BEACON";

/// A single mesh-chat endpoint: packet taxonomy, reliable delivery, pairing,
/// and presence, bound to one radio substrate and one persistent store.
pub struct Node {
    radio: Arc<dyn RadioHandle>,
    config: NodeConfig,
    local_addr: u16,
    ids: MsgIdGen,
    dedupe: DedupeWindow,
    seen_peers: SeenPeerTable,
    beacons: BeaconList,
    route_health: RouteHealthTable,
    pairing: PairingStore,
    pending: PendingTable,
    chat_log: ChatLog,
    pairing_mode: PairingMode,
    last_presence_ms: u64,
    last_beacon_ms: u64,
}

impl Node {
    /// Build a node bound to `radio`, persisting pairing state in `store`.
    #[must_use]
    pub fn new(radio: Arc<dyn RadioHandle>, store: Box<dyn KvStore>, config: NodeConfig) -> Self {
        let local_addr = radio.local_address();
        Self {
            pairing: PairingStore::new(store, local_addr),
            radio,
            local_addr,
            ids: MsgIdGen::new(),
            dedupe: DedupeWindow::new(),
            seen_peers: SeenPeerTable::new(),
            beacons: BeaconList::new(),
            route_health: RouteHealthTable::new(),
            pending: PendingTable::new(),
            chat_log: ChatLog::new(),
            pairing_mode: config.pairing_mode,
            config,
            last_presence_ms: 0,
            last_beacon_ms: 0,
        }
    }

    /// This node's own address.
    #[must_use]
    pub fn local_addr(&self) -> u16 {
        self.local_addr
    }

    /// Read-only access to the chat log, for the UI.
    #[must_use]
    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    /// Read-only access to recently heard peers, for the UI.
    #[must_use]
    pub fn seen_peers(&self) -> &SeenPeerTable {
        &self.seen_peers
    }

    /// Read-only access to the pair-beacon list, for the Listen UI.
    #[must_use]
    pub fn beacons(&self) -> &BeaconList {
        &self.beacons
    }

    /// Switch whether this node advertises itself for interactive pairing.
    pub fn set_pairing_mode(&mut self, mode: PairingMode) {
        self.pairing_mode = mode;
    }

    /// True iff a pairwise key is already established with `peer`.
    #[must_use]
    pub fn is_paired(&self, peer: u16) -> bool {
        self.pairing.has_key(peer)
    }

    /// Decode and dispatch one inbound radio record (spec §4.4's `on_rx`).
    ///
    /// Malformed packets and internal protocol errors (no key, replay,
    /// decrypt failure, handshake mismatch) are absorbed here as `tracing`
    /// events, per spec §7's propagation rule — nothing reaches the caller.
    pub fn on_rx(&mut self, src: u16, bytes: &[u8], rssi: i16, snr: f32, now_ms: u64, now_sec: u32) {
        if src == BROADCAST_ADDR {
            tracing::warn!(src, "node: dropping packet reporting the broadcast address as its source");
            return;
        }
        let pkt = match WireChatPacket::decode(bytes) {
            Ok(pkt) => pkt,
            Err(err) => {
                tracing::warn!(src, %err, "node: dropping malformed packet");
                return;
            }
        };
        tracing::debug!(src, kind = ?pkt.kind, msg_id = pkt.msg_id, rssi, snr, "node: rx");

        let paired = self.pairing.has_key(src);
        self.seen_peers.note(src, now_sec, paired);

        match pkt.kind {
            PacketKind::Ack => self.on_ack(src, &pkt, now_ms),
            PacketKind::Discovery => self.on_discovery(src, &pkt),
            PacketKind::Presence => self.on_presence(src, &pkt, now_sec),
            PacketKind::PairRequest => self.on_pair_request(src, &pkt),
            PacketKind::PairAccept => self.on_pair_accept(src, &pkt),
            PacketKind::SecureChat => self.on_secure_chat(src, &pkt, now_sec),
            PacketKind::Chat => self.on_chat(src, &pkt, now_sec),
        }
    }

    fn on_ack(&mut self, src: u16, pkt: &WireChatPacket, now_ms: u64) {
        if pkt.to != self.local_addr {
            return;
        }
        self.chat_log.mark_delivered(pkt.ref_msg_id);
        self.pending.clear_by_msg_id(pkt.ref_msg_id);
        self.route_health.note_success(src, now_ms);
        tracing::debug!(src, msg_id = pkt.ref_msg_id, "node: ack received");
    }

    fn on_discovery(&mut self, src: u16, pkt: &WireChatPacket) {
        if pkt.to != self.local_addr && pkt.to != BROADCAST_ADDR {
            return;
        }
        self.send_ack(src, pkt.ref_msg_id);
    }

    fn on_presence(&mut self, src: u16, pkt: &WireChatPacket, now_sec: u32) {
        if pkt.text_bytes().starts_with(PAIR_BEACON_TAG) {
            self.beacons.note(src, now_sec);
            tracing::debug!(src, "node: pair beacon observed");
        }
        // General presence already updated SeenPeer above in on_rx.
    }

    fn on_pair_request(&mut self, src: u16, pkt: &WireChatPacket) {
        let accept_nonce: u32 = rand::random();
        if let Err(err) = self.pairing.derive_from_request(src, pkt.msg_id, pkt.nonce, accept_nonce) {
            tracing::warn!(src, %err, "node: pairing derive failed");
            return;
        }

        let mut reply = WireChatPacket::new(PacketKind::PairAccept, self.local_addr, src);
        reply.msg_id = self.ids.next_id();
        reply.ref_msg_id = pkt.msg_id;
        reply.nonce = accept_nonce;
        self.radio.send(src, &reply.encode());
        tracing::info!(src, "node: pairing accepted");
    }

    fn on_pair_accept(&mut self, src: u16, pkt: &WireChatPacket) {
        if pkt.to != self.local_addr {
            return;
        }
        match self.pairing.resolve_pending_request(src, pkt.ref_msg_id, pkt.nonce) {
            Ok(Some(_key)) => tracing::info!(src, "node: pairing complete"),
            Ok(None) => tracing::debug!(src, "node: pair accept matched no outstanding request"),
            Err(err) => tracing::warn!(src, %err, "node: pairing resolve failed"),
        }
    }

    fn on_secure_chat(&mut self, src: u16, pkt: &WireChatPacket, now_sec: u32) {
        if pkt.to != self.local_addr {
            return;
        }
        if self.dedupe.seen(src, pkt.msg_id) {
            tracing::debug!(src, msg_id = pkt.msg_id, "node: duplicate SecureChat, re-acking");
            self.send_ack(src, pkt.msg_id);
            return;
        }
        self.dedupe.remember(src, pkt.msg_id);

        let key = match self.pairing.load_key(src) {
            Ok(Some(key)) => key,
            Ok(None) => {
                tracing::debug!(src, "node: no pairwise key, requesting pairing");
                self.request_pairing(src);
                return;
            }
            Err(err) => {
                tracing::warn!(src, %err, "node: key lookup failed");
                return;
            }
        };

        match self.pairing.check_replay_and_update(src, pkt.msg_id) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(src, msg_id = pkt.msg_id, "node: replayed SecureChat rejected");
                return;
            }
            Err(err) => {
                tracing::warn!(src, %err, "node: replay check failed");
                return;
            }
        }

        let ciphertext = pkt.text_bytes();
        let mut plaintext = vec![0u8; ciphertext.len()];
        if let Err(err) =
            meshtalk_crypto::aes256_ctr_transform(&key, pkt.from, pkt.to, pkt.nonce, pkt.msg_id, ciphertext, &mut plaintext)
        {
            tracing::warn!(src, %err, "node: decrypt failed");
            return;
        }

        let text = String::from_utf8_lossy(&plaintext);
        self.chat_log.add(src, false, pkt.msg_id, &text, now_sec);
        self.send_ack(src, pkt.msg_id);
    }

    fn on_chat(&mut self, src: u16, pkt: &WireChatPacket, now_sec: u32) {
        if pkt.to != self.local_addr && pkt.to != BROADCAST_ADDR {
            return;
        }
        if self.dedupe.seen(src, pkt.msg_id) {
            self.send_ack(src, pkt.msg_id);
            return;
        }
        self.dedupe.remember(src, pkt.msg_id);

        let text = String::from_utf8_lossy(pkt.text_bytes());
        self.chat_log.add(src, false, pkt.msg_id, &text, now_sec);
        self.send_ack(src, pkt.msg_id);
    }

    fn send_ack(&mut self, dst: u16, ref_msg_id: u32) {
        let mut pkt = WireChatPacket::new(PacketKind::Ack, self.local_addr, dst);
        pkt.msg_id = self.ids.next_id();
        pkt.ref_msg_id = ref_msg_id;
        self.radio.send(dst, &pkt.encode());
    }

    fn request_pairing(&mut self, dst: u16) {
        let msg_id = self.ids.next_id();
        let nonce: u32 = rand::random();
        let mut pkt = WireChatPacket::new(PacketKind::PairRequest, self.local_addr, dst);
        pkt.msg_id = msg_id;
        pkt.nonce = nonce;
        self.radio.send(dst, &pkt.encode());
        self.pairing.record_outgoing_request(dst, msg_id, nonce);
        tracing::info!(dst, "node: requesting pairing");
    }

    /// Compose entry point (spec §4.7): send `text` to `dst`, pairing first
    /// if no key is established yet.
    pub fn send_draft(&mut self, dst: u16, text: &str, now_ms: u64, now_sec: u32) -> Result<()> {
        if self.pairing.has_key(dst) {
            self.send_secure(dst, text, now_ms, now_sec)
        } else {
            self.request_pairing(dst);
            self.chat_log.add(dst, true, 0, "[pairing requested, resend after it completes]", now_sec);
            Ok(())
        }
    }

    fn send_secure(&mut self, dst: u16, text: &str, now_ms: u64, now_sec: u32) -> Result<()> {
        let key = self
            .pairing
            .load_key(dst)?
            .expect("send_secure is only called once has_key(dst) is true");

        let msg_id = self.ids.next_id();
        let nonce: u32 = rand::random();
        let mut plaintext = text.as_bytes().to_vec();
        plaintext.truncate(MAX_TEXT_LEN);

        let mut ciphertext = vec![0u8; plaintext.len()];
        meshtalk_crypto::aes256_ctr_transform(&key, self.local_addr, dst, nonce, msg_id, &plaintext, &mut ciphertext)?;

        let mut pkt = WireChatPacket::new(PacketKind::SecureChat, self.local_addr, dst);
        pkt.msg_id = msg_id;
        pkt.nonce = nonce;
        pkt.ts = now_sec;
        pkt.set_text(&ciphertext)?;

        let sync_ok = self.radio.send(dst, &pkt.encode());
        let attempts = u8::from(sync_ok);
        // Spec §4.7: schedule the first retry at `retry_delay(1)` regardless
        // of whether the synchronous attempt itself succeeded.
        let next_send_ms = now_ms + pending::retry_delay_ms(1, &self.config.timing);
        if !self.pending.enqueue(dst, pkt, attempts, next_send_ms, now_ms) {
            return Err(crate::error::Error::NoPendingSlot {
                capacity: crate::pending::CAPACITY,
            });
        }

        self.chat_log.add(dst, true, msg_id, text, now_sec);
        tracing::debug!(dst, msg_id, sync_ok, "node: secure chat queued");
        Ok(())
    }

    /// Drive retries, presence, and pair-beacon broadcasts (spec §5's main
    /// loop; call once per loop iteration after draining the receive
    /// worker's channel).
    pub fn tick(&mut self, now_ms: u64, now_sec: u32) {
        self.pending.tick(
            now_ms,
            self.radio.as_ref(),
            &mut self.route_health,
            &mut self.chat_log,
            &mut self.ids,
            self.local_addr,
            &self.config.timing,
        );
        self.presence_tick(now_ms);
        self.pair_beacon_tick(now_ms);
    }

    fn presence_tick(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.last_presence_ms) < self.config.timing.presence_interval_ms {
            return;
        }
        let mut pkt = WireChatPacket::new(PacketKind::Presence, self.local_addr, BROADCAST_ADDR);
        pkt.msg_id = self.ids.next_id();
        pkt.nonce = rand::random();
        let _ = pkt.set_text(PRESENCE_TAG);
        self.radio.send(BROADCAST_ADDR, &pkt.encode());
        self.last_presence_ms = now_ms;
        tracing::debug!("node: presence broadcast");
    }

    fn pair_beacon_tick(&mut self, now_ms: u64) {
        if self.pairing_mode != PairingMode::Broadcast {
            return;
        }
        if now_ms.saturating_sub(self.last_beacon_ms) < self.config.timing.pair_beacon_interval_ms {
            return;
        }
        let mut pkt = WireChatPacket::new(PacketKind::Presence, self.local_addr, BROADCAST_ADDR);
        pkt.msg_id = self.ids.next_id();
        pkt.nonce = rand::random();
        let _ = pkt.set_text(PAIR_BEACON_TAG);
        self.radio.send(BROADCAST_ADDR, &pkt.encode());
        self.last_beacon_ms = now_ms;
        tracing::debug!("node: pair beacon broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtalk_radio::{LoopbackRadio, ManualClock, RadioProfile};
    use meshtalk_store::MemKvStore;

    fn node_pair() -> (Node, Node, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let (radio_a, radio_b) = LoopbackRadio::pair(1, 2, RadioProfile::default(), clock.clone());
        let a = Node::new(radio_a, Box::new(MemKvStore::new()), NodeConfig::default());
        let b = Node::new(radio_b, Box::new(MemKvStore::new()), NodeConfig::default());
        (a, b, clock)
    }

    async fn deliver_one(to: &mut Node, radio: &Arc<dyn RadioHandle>, now_ms: u64, now_sec: u32) {
        let record = radio.wait_for_packet().await.unwrap();
        to.on_rx(record.src, &record.bytes, record.rssi, record.snr, now_ms, now_sec);
    }

    #[tokio::test]
    async fn pairing_then_secure_chat_round_trip() {
        let (mut a, mut b, clock) = node_pair();
        let radio_a: Arc<dyn RadioHandle> = a.radio.clone();
        let radio_b: Arc<dyn RadioHandle> = b.radio.clone();

        a.send_draft(2, "hello", clock.now_ms(), 0).unwrap();
        deliver_one(&mut b, &radio_b, clock.now_ms(), 0).await; // PairRequest
        deliver_one(&mut a, &radio_a, clock.now_ms(), 0).await; // PairAccept

        assert!(a.pairing.has_key(2));
        assert!(b.pairing.has_key(1));

        a.send_draft(2, "hello again", clock.now_ms(), 0).unwrap();
        deliver_one(&mut b, &radio_b, clock.now_ms(), 0).await; // SecureChat
        deliver_one(&mut a, &radio_a, clock.now_ms(), 0).await; // Ack

        assert_eq!(b.chat_log().at(0).unwrap().text, "hello again");
        assert!(a.chat_log().at(1).unwrap().delivered);
        assert_eq!(a.pending.active_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_chat_is_acked_but_not_relogged() {
        let (mut a, mut b, _clock) = node_pair();
        let mut pkt = WireChatPacket::new(PacketKind::Chat, 1, 2);
        pkt.msg_id = 5;
        pkt.set_text(b"hi").unwrap();
        let bytes = pkt.encode();

        b.on_rx(1, &bytes, -40, 8.0, 0, 0);
        b.on_rx(1, &bytes, -40, 8.0, 0, 0);

        assert_eq!(b.chat_log().size(), 1);
    }

    #[tokio::test]
    async fn rx_reporting_the_broadcast_address_as_source_is_dropped() {
        let (_a, mut b, _clock) = node_pair();
        let mut pkt = WireChatPacket::new(PacketKind::Chat, BROADCAST_ADDR, 2);
        pkt.msg_id = 1;
        pkt.set_text(b"hi").unwrap();
        let bytes = pkt.encode();

        b.on_rx(BROADCAST_ADDR, &bytes, -40, 8.0, 0, 0);

        assert_eq!(b.chat_log().size(), 0);
        assert!(!b.pairing.has_key(BROADCAST_ADDR));
    }
}
