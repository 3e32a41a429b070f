//! # MESHTALK Core
//!
//! The reliable, deduplicated, pairwise-authenticated direct-message
//! protocol for radio-mesh chat nodes: packet taxonomy and on-wire layout,
//! the bounded-retry send queue with discovery escalation, the receive-side
//! dedupe and replay window, pairwise key establishment, per-destination
//! route-health tracking, and presence/pair-beacon advertisement.
//!
//! Everything in this crate is single-threaded: [`node::Node`] owns every
//! mutable table directly and expects to be driven from one main loop
//! (`on_rx` fed by a receive worker over a channel, `tick` called every
//! iteration, `send_draft` called from the compose UI). See [`node`] for
//! the orchestrator and spec §5 for the concurrency model this follows.
//!
//! `meshtalk-core` depends on [`meshtalk_radio`] for the [`RadioHandle`]
//! trait it sends and receives bytes through, and on [`meshtalk_store`] for
//! the persistent key/value store backing pairing state. It does not
//! depend on any concrete radio or storage implementation.
//!
//! [`RadioHandle`]: meshtalk_radio::RadioHandle

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod beacon;
pub mod chatlog;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod ids;
pub mod node;
pub mod packet;
pub mod pairing;
pub mod pending;
pub mod route_health;
pub mod seen_peer;

pub use beacon::BeaconList;
pub use chatlog::{ChatLog, ChatMsg};
pub use config::{NodeConfig, PairingMode, RadioParams, TimingParams};
pub use dedupe::DedupeWindow;
pub use error::{Error, Result};
pub use ids::MsgIdGen;
pub use node::Node;
pub use packet::{PacketError, PacketKind, WireChatPacket, BROADCAST_ADDR, MAX_TEXT_LEN, UNASSIGNED_ADDR, WIRE_PACKET_SIZE};
pub use pairing::PairingStore;
pub use pending::PendingTable;
pub use route_health::{RouteHealth, RouteHealthTable};
pub use seen_peer::{SeenPeer, SeenPeerTable};
