//! Bounded chat log (spec §3, §6.2).
//!
//! A ring buffer the UI reads oldest-to-newest (`at`/`size`), written by the
//! RX demux and the compose entry point. `mark_delivered`/`mark_failed` are
//! idempotent: once an entry is marked, later calls are no-ops (spec §8's
//! "`mark_delivered(m)` is idempotent" law).

/// Minimum capacity (spec §5).
pub const CAPACITY: usize = 30;

/// Maximum stored text length, matching the wire payload cap.
pub const MAX_TEXT_LEN: usize = 96;

/// One chat-log entry.
#[derive(Debug, Clone)]
pub struct ChatMsg {
    /// Wall-clock seconds at time of logging.
    pub ts: u32,
    /// The other party's address.
    pub peer: u16,
    /// `true` if this node sent the message; `false` if it was received.
    pub outgoing: bool,
    /// `true` once an ACK has been observed for an outgoing entry.
    pub delivered: bool,
    /// `true` once an outgoing entry has exhausted its retry budget.
    pub failed: bool,
    /// The message id this entry corresponds to.
    pub msg_id: u32,
    /// Message text, truncated to [`MAX_TEXT_LEN`].
    pub text: String,
}

/// Bounded FIFO chat log.
#[derive(Debug)]
pub struct ChatLog {
    slots: [Option<ChatMsg>; CAPACITY],
    next: usize,
    len: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatLog {
    /// An empty log with the spec-mandated capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            next: 0,
            len: 0,
        }
    }

    /// Append an entry, evicting the oldest if the log is full.
    pub fn add(&mut self, peer: u16, outgoing: bool, msg_id: u32, text: &str, ts: u32) {
        let mut text = text.to_string();
        text.truncate(MAX_TEXT_LEN);
        self.slots[self.next] = Some(ChatMsg {
            ts,
            peer,
            outgoing,
            delivered: false,
            failed: false,
            msg_id,
            text,
        });
        self.next = (self.next + 1) % CAPACITY;
        self.len = (self.len + 1).min(CAPACITY);
    }

    fn find_mut(&mut self, msg_id: u32) -> Option<&mut ChatMsg> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|m| m.msg_id == msg_id && m.outgoing)
    }

    /// Mark the outgoing entry for `msg_id` delivered. Idempotent.
    ///
    /// Returns `true` if an entry was found (regardless of whether it was
    /// already marked).
    pub fn mark_delivered(&mut self, msg_id: u32) -> bool {
        match self.find_mut(msg_id) {
            Some(entry) => {
                entry.delivered = true;
                true
            }
            None => false,
        }
    }

    /// Mark the outgoing entry for `msg_id` failed. Idempotent.
    pub fn mark_failed(&mut self, msg_id: u32) -> bool {
        match self.find_mut(msg_id) {
            Some(entry) => {
                entry.failed = true;
                true
            }
            None => false,
        }
    }

    /// Number of entries currently stored (capped at [`CAPACITY`]).
    #[must_use]
    pub fn size(&self) -> usize {
        self.len
    }

    /// The `idx`-th entry, oldest first.
    #[must_use]
    pub fn at(&self, idx: usize) -> Option<&ChatMsg> {
        if idx >= self.len {
            return None;
        }
        let oldest = (self.next + CAPACITY - self.len) % CAPACITY;
        let slot_idx = (oldest + idx) % CAPACITY;
        self.slots[slot_idx].as_ref()
    }

    /// The newest entry involving `peer`, if any — used by the compose UI
    /// to prefill a reply target (original `Ui.h::latestMessage`).
    #[must_use]
    pub fn latest_for(&self, peer: u16) -> Option<&ChatMsg> {
        (0..self.len)
            .rev()
            .filter_map(|idx| self.at(idx))
            .find(|m| m.peer == peer)
    }
}
