//! Node configuration (spec §6.5).
//!
//! Mirrors the teacher's `NodeConfig`/sub-config pattern
//! (`wraith_core::node::config`): one top-level struct grouping
//! radio-parameter and timing sub-configs, each with a `Default` impl
//! holding literal constants rather than reading the environment.

/// Radio parameters. Substrate-specific; a real driver maps these onto its
/// own register set. Not interpreted by the core protocol itself.
#[derive(Debug, Clone, Copy)]
pub struct RadioParams {
    /// Carrier frequency, in Hz.
    pub freq_hz: u32,
    /// Channel bandwidth, in kHz.
    pub bw_khz: u32,
    /// Spreading factor.
    pub spreading_factor: u8,
    /// Transmit power, in dBm.
    pub tx_dbm: i8,
    /// Sync word.
    pub syncword: u8,
    /// Preamble length, in symbols.
    pub preamble_len: u16,
}

impl Default for RadioParams {
    fn default() -> Self {
        Self {
            freq_hz: 915_000_000,
            bw_khz: 125,
            spreading_factor: 7,
            tx_dbm: 14,
            syncword: 0x34,
            preamble_len: 8,
        }
    }
}

/// Timing constants governing presence, pair beacons, and the retry/backoff
/// machine (spec §6.5).
#[derive(Debug, Clone, Copy)]
pub struct TimingParams {
    /// Interval between `Presence` broadcasts, in ms.
    pub presence_interval_ms: u64,
    /// Interval between pair-beacon broadcasts while in Broadcast mode, in ms.
    pub pair_beacon_interval_ms: u64,
    /// Base retry delay multiplier, in ms.
    pub retry_base_ms: u64,
    /// Width of the retry-jitter window, in ms.
    pub jitter_window_ms: u64,
    /// Attempts before unicast discovery escalation is attempted.
    pub max_unicast_attempts: u8,
    /// Attempts before a pending send is given up on.
    pub max_total_attempts: u8,
    /// Minimum time between discovery escalations for the same slot, in ms.
    pub discovery_cooldown_ms: u64,
    /// How long a route stays fresh without a new ACK/discovery, in ms.
    pub route_freshness_ms: u64,
    /// Minimum airtime-refused backoff, in ms.
    pub airtime_deferral_floor_ms: u64,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            presence_interval_ms: 30_000,
            pair_beacon_interval_ms: 5_000,
            retry_base_ms: 2_500,
            jitter_window_ms: 600,
            max_unicast_attempts: 3,
            max_total_attempts: 5,
            discovery_cooldown_ms: 5_000,
            route_freshness_ms: 45_000,
            airtime_deferral_floor_ms: 1_200,
        }
    }
}

/// Whether this node is currently advertising itself for interactive
/// pairing (spec §4.6's `pair_beacon_tick`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingMode {
    /// Not advertising; pair beacons are not emitted.
    #[default]
    Idle,
    /// UI is in "Broadcast" pairing mode; pair beacons are emitted.
    Broadcast,
}

/// Top-level node configuration.
#[derive(Debug, Clone, Copy)]
pub struct NodeConfig {
    /// Radio parameters.
    pub radio: RadioParams,
    /// Timing constants.
    pub timing: TimingParams,
    /// Initial pairing mode.
    pub pairing_mode: PairingMode,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            radio: RadioParams::default(),
            timing: TimingParams::default(),
            pairing_mode: PairingMode::default(),
        }
    }
}
