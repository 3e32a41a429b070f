//! The on-wire chat packet (spec §3, §6.4).
//!
//! The `kind` byte is a variant at the type level internally
//! ([`PacketKind`]), converted to/from the wire byte only at the parse/
//! encode boundary (spec §9's "Variant-by-byte packet kinds" guidance). The
//! wire layout itself stays the flat fixed-size record the firmware and any
//! future real radio driver expect.

use thiserror::Error;

/// Node address reserved for broadcast.
pub const BROADCAST_ADDR: u16 = 0xFFFF;

/// Node address meaning "unassigned".
pub const UNASSIGNED_ADDR: u16 = 0;

/// Maximum bytes of `text` payload (spec §1, §3).
pub const MAX_TEXT_LEN: usize = 96;

/// Total on-wire size of a [`WireChatPacket`], in bytes.
///
/// Spec §3's field table (`kind` 1 + `msg_id` 4 + `to` 2 + `from` 2 + `ts` 4
/// + `ref_msg_id` 4 + `nonce` 4 + `text_len` 2 + `reserved` 1 + `text` 96)
/// sums to 120, not the 116 spec §6.4's prose claims; the field table is
/// authoritative here since it is the only place per-field width is pinned
/// down (see DESIGN.md).
pub const WIRE_PACKET_SIZE: usize = 120;

/// Tagged packet kind (spec §3, §6.4). Wire values MUST be stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Plain-text direct or broadcast chat message.
    Chat = 0,
    /// Acknowledgment of a `Chat`/`SecureChat`/`Discovery`.
    Ack = 1,
    /// Mesh-layer route refresh probe.
    Discovery = 2,
    /// Liveness/pair-beacon advertisement.
    Presence = 3,
    /// First message of the pairing handshake.
    PairRequest = 4,
    /// Second message of the pairing handshake.
    PairAccept = 5,
    /// Encrypted direct chat message.
    SecureChat = 6,
}

impl TryFrom<u8> for PacketKind {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Chat),
            1 => Ok(Self::Ack),
            2 => Ok(Self::Discovery),
            3 => Ok(Self::Presence),
            4 => Ok(Self::PairRequest),
            5 => Ok(Self::PairAccept),
            6 => Ok(Self::SecureChat),
            other => Err(PacketError::InvalidKind(other)),
        }
    }
}

/// Packet parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Wire buffer was not exactly [`WIRE_PACKET_SIZE`] bytes.
    #[error("wire buffer has wrong length: expected {expected}, got {actual}")]
    WrongLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The `kind` byte did not match a known [`PacketKind`].
    #[error("invalid packet kind byte: {0}")]
    InvalidKind(u8),

    /// `text_len` exceeded [`MAX_TEXT_LEN`].
    #[error("text_len {0} exceeds the {MAX_TEXT_LEN}-byte cap")]
    TextTooLong(u16),
}

/// The on-wire chat packet (spec §3).
#[derive(Debug, Clone)]
pub struct WireChatPacket {
    /// Packet kind tag.
    pub kind: PacketKind,
    /// Sender-generated id, monotonic per node within a session.
    pub msg_id: u32,
    /// Destination address, or [`BROADCAST_ADDR`].
    pub to: u16,
    /// Source address, set by the sender.
    pub from: u16,
    /// Sender wall-clock seconds (best-effort, not synchronized).
    pub ts: u32,
    /// For `Ack`/`PairAccept`: the `msg_id` being acknowledged/accepted. Else 0.
    pub ref_msg_id: u32,
    /// Per-packet entropy; semantics depend on `kind` (spec §4.3, §4.5).
    pub nonce: u32,
    /// Bytes of `text` in use.
    pub text_len: u16,
    /// Payload: ASCII text, ciphertext, or handshake tag.
    pub text: [u8; MAX_TEXT_LEN],
}

impl WireChatPacket {
    /// Build a packet with an empty payload.
    #[must_use]
    pub fn new(kind: PacketKind, from: u16, to: u16) -> Self {
        Self {
            kind,
            msg_id: 0,
            to,
            from,
            ts: 0,
            ref_msg_id: 0,
            nonce: 0,
            text_len: 0,
            text: [0u8; MAX_TEXT_LEN],
        }
    }

    /// The portion of `text` actually in use.
    #[must_use]
    pub fn text_bytes(&self) -> &[u8] {
        &self.text[..self.text_len as usize]
    }

    /// Overwrite the payload. Fails if `bytes` exceeds [`MAX_TEXT_LEN`].
    pub fn set_text(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        if bytes.len() > MAX_TEXT_LEN {
            return Err(PacketError::TextTooLong(bytes.len() as u16));
        }
        self.text = [0u8; MAX_TEXT_LEN];
        self.text[..bytes.len()].copy_from_slice(bytes);
        self.text_len = bytes.len() as u16;
        Ok(())
    }

    /// Encode to the fixed-size little-endian wire record.
    #[must_use]
    pub fn encode(&self) -> [u8; WIRE_PACKET_SIZE] {
        let mut buf = [0u8; WIRE_PACKET_SIZE];
        let mut off = 0;

        buf[off] = self.kind as u8;
        off += 1;
        buf[off..off + 4].copy_from_slice(&self.msg_id.to_le_bytes());
        off += 4;
        buf[off..off + 2].copy_from_slice(&self.to.to_le_bytes());
        off += 2;
        buf[off..off + 2].copy_from_slice(&self.from.to_le_bytes());
        off += 2;
        buf[off..off + 4].copy_from_slice(&self.ts.to_le_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.ref_msg_id.to_le_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.nonce.to_le_bytes());
        off += 4;
        buf[off..off + 2].copy_from_slice(&self.text_len.to_le_bytes());
        off += 2;
        // reserved byte, stays 0
        off += 1;
        buf[off..off + MAX_TEXT_LEN].copy_from_slice(&self.text);

        buf
    }

    /// Decode from a wire-format buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() != WIRE_PACKET_SIZE {
            return Err(PacketError::WrongLength {
                expected: WIRE_PACKET_SIZE,
                actual: bytes.len(),
            });
        }

        let mut off = 0;
        let kind = PacketKind::try_from(bytes[off])?;
        off += 1;
        let msg_id = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let to = u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap());
        off += 2;
        let from = u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap());
        off += 2;
        let ts = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let ref_msg_id = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let nonce = u32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        off += 4;
        let text_len = u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap());
        off += 2;
        off += 1; // reserved

        if text_len as usize > MAX_TEXT_LEN {
            return Err(PacketError::TextTooLong(text_len));
        }

        let mut text = [0u8; MAX_TEXT_LEN];
        text.copy_from_slice(&bytes[off..off + MAX_TEXT_LEN]);

        Ok(Self {
            kind,
            msg_id,
            to,
            from,
            ts,
            ref_msg_id,
            nonce,
            text_len,
            text,
        })
    }
}
