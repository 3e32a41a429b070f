//! The radio substrate capability set consumed by the core protocol.
//!
//! Generalizes `wraith_transport::transport::Transport` (async `send_to`/
//! `recv_from` over raw bytes) to the narrower capability set spec §6.1
//! actually needs: a best-effort typed send, an airtime readiness signal,
//! diagnostic counters, and a notification channel the receive worker can
//! block on. Like `Transport`, `RadioHandle` speaks in raw bytes — the
//! packet encoding lives above this trait, in `meshtalk-core::packet`.

use async_trait::async_trait;

/// One inbound record yielded by the radio substrate: source address, raw
/// wire bytes, and signal-quality metadata.
#[derive(Debug, Clone)]
pub struct RxRecord {
    /// Source node address, as reported by the substrate.
    pub src: u16,
    /// Raw wire bytes of the received packet.
    pub bytes: Vec<u8>,
    /// Received signal strength indicator, in dBm.
    pub rssi: i16,
    /// Signal-to-noise ratio, in dB.
    pub snr: f32,
}

/// Capability set a radio substrate exposes to the core protocol (spec §6.1).
#[async_trait]
pub trait RadioHandle: Send + Sync {
    /// Queue `bytes` for transmission to `dst`.
    ///
    /// Returns `false` if the substrate refuses due to airtime/backpressure.
    /// `true` means the packet was queued for RF emission, not that it was
    /// acknowledged.
    fn send(&self, dst: u16, bytes: &[u8]) -> bool;

    /// This node's own address, as assigned by the substrate.
    fn local_address(&self) -> u16;

    /// Milliseconds until the substrate is willing to accept another send,
    /// relative to `now_ms`. `0` means ready now.
    fn airtime_remaining_ms(&self, now_ms: u64) -> u32;

    /// Total packets transmitted, for diagnostics.
    fn tx_count(&self) -> u64;

    /// Total packets received, for diagnostics.
    fn rx_count(&self) -> u64;

    /// Cumulative time spent transmitting, in milliseconds, for diagnostics.
    fn tx_airtime_ms(&self) -> u64;

    /// Suspend until a packet is available, then return it.
    ///
    /// Returns `None` only when the substrate has been shut down and will
    /// never produce another packet. The receive worker calls this in a
    /// loop, draining the substrate to empty before suspending again (spec
    /// §5's FIFO ordering guarantee).
    async fn wait_for_packet(&self) -> Option<RxRecord>;
}
