//! An in-memory radio pair, wiring two [`RadioHandle`]s directly together.
//!
//! No RF, no real airtime — but a realistic airtime *budget*, sized by the
//! Semtech time-on-air formula (`crate::time_on_air`), so integration tests
//! and the demo CLI exercise real airtime-deferral behavior (spec P7)
//! without a physical radio. Broadcast address `0xFFFF` (spec §6.4) is
//! delivered to the peer unconditionally; anything else is only delivered
//! if addressed to the peer's own address.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::clock::Clock;
use crate::handle::{RadioHandle, RxRecord};
use crate::time_on_air::time_on_air_us;

/// Node address reserved for broadcast (spec §3).
pub const BROADCAST_ADDR: u16 = 0xFFFF;

/// Radio parameters that drive the time-on-air estimate (spec §6.5).
#[derive(Debug, Clone, Copy)]
pub struct RadioProfile {
    /// Channel bandwidth in Hz.
    pub bw_hz: u32,
    /// Spreading factor.
    pub sf: u8,
    /// Coding-rate denominator, `5..=8`.
    pub cr_denom: u8,
    /// Preamble length in symbols.
    pub preamble_len: u16,
}

impl Default for RadioProfile {
    fn default() -> Self {
        Self {
            bw_hz: 125_000,
            sf: 7,
            cr_denom: 5,
            preamble_len: 8,
        }
    }
}

/// One side of an in-memory radio pair.
pub struct LoopbackRadio {
    local_addr: u16,
    peer_addr: u16,
    clock: Arc<dyn Clock>,
    profile: RadioProfile,
    peer_tx: mpsc::UnboundedSender<RxRecord>,
    inbox: Mutex<mpsc::UnboundedReceiver<RxRecord>>,
    busy_until_ms: AtomicU64,
    tx_count: AtomicU64,
    rx_count: AtomicU64,
    tx_airtime_ms: AtomicU64,
}

impl LoopbackRadio {
    /// Build a pair of cross-wired radios for `addr_a` and `addr_b`, sharing `clock`.
    #[must_use]
    pub fn pair(
        addr_a: u16,
        addr_b: u16,
        profile: RadioProfile,
        clock: Arc<dyn Clock>,
    ) -> (Arc<LoopbackRadio>, Arc<LoopbackRadio>) {
        let (tx_a_to_b, rx_at_b) = mpsc::unbounded_channel();
        let (tx_b_to_a, rx_at_a) = mpsc::unbounded_channel();

        let a = Arc::new(LoopbackRadio {
            local_addr: addr_a,
            peer_addr: addr_b,
            clock: Arc::clone(&clock),
            profile,
            peer_tx: tx_a_to_b,
            inbox: Mutex::new(rx_at_a),
            busy_until_ms: AtomicU64::new(0),
            tx_count: AtomicU64::new(0),
            rx_count: AtomicU64::new(0),
            tx_airtime_ms: AtomicU64::new(0),
        });
        let b = Arc::new(LoopbackRadio {
            local_addr: addr_b,
            peer_addr: addr_a,
            clock,
            profile,
            peer_tx: tx_b_to_a,
            inbox: Mutex::new(rx_at_b),
            busy_until_ms: AtomicU64::new(0),
            tx_count: AtomicU64::new(0),
            rx_count: AtomicU64::new(0),
            tx_airtime_ms: AtomicU64::new(0),
        });
        (a, b)
    }
}

#[async_trait]
impl RadioHandle for LoopbackRadio {
    fn send(&self, dst: u16, bytes: &[u8]) -> bool {
        let now = self.clock.now_ms();
        let busy_until = self.busy_until_ms.load(Ordering::SeqCst);
        if now < busy_until {
            return false;
        }
        if dst != BROADCAST_ADDR && dst != self.peer_addr {
            return false;
        }

        let airtime_us = time_on_air_us(
            self.profile.bw_hz,
            self.profile.sf,
            self.profile.cr_denom,
            self.profile.preamble_len,
            bytes.len() as u16,
        );
        let airtime_ms = u64::from(airtime_us / 1000).max(1);
        self.busy_until_ms.store(now + airtime_ms, Ordering::SeqCst);
        self.tx_count.fetch_add(1, Ordering::SeqCst);
        self.tx_airtime_ms.fetch_add(airtime_ms, Ordering::SeqCst);

        let record = RxRecord {
            src: self.local_addr,
            bytes: bytes.to_vec(),
            rssi: -60,
            snr: 9.0,
        };
        // The peer having gone away (test teardown) is not a send failure on our end.
        let _ = self.peer_tx.send(record);
        true
    }

    fn local_address(&self) -> u16 {
        self.local_addr
    }

    fn airtime_remaining_ms(&self, now_ms: u64) -> u32 {
        let busy_until = self.busy_until_ms.load(Ordering::SeqCst);
        busy_until.saturating_sub(now_ms) as u32
    }

    fn tx_count(&self) -> u64 {
        self.tx_count.load(Ordering::SeqCst)
    }

    fn rx_count(&self) -> u64 {
        self.rx_count.load(Ordering::SeqCst)
    }

    fn tx_airtime_ms(&self) -> u64 {
        self.tx_airtime_ms.load(Ordering::SeqCst)
    }

    async fn wait_for_packet(&self) -> Option<RxRecord> {
        let mut inbox = self.inbox.lock().await;
        let record = inbox.recv().await;
        if record.is_some() {
            self.rx_count.fetch_add(1, Ordering::SeqCst);
        }
        record
    }
}
