//! Incoming deliveries.
//!
//! A delivery is one message transfer. Its payload arrives in one or more
//! transfer frames and is consumed incrementally by the application.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, Bytes, BytesMut};

slotmap::new_key_type! {
    /// Handle to a delivery held in its link's arena.
    ///
    /// A handle becomes stale once the delivery is both retired and settled.
    pub struct DeliveryId;
}

/// Delivery outcome, as set locally or reported by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryState {
    Received,
    Accepted,
    Rejected,
    Released,
    Modified,
}

impl DeliveryState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Released => "released",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = DeliveryStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "released" => Ok(Self::Released),
            "modified" => Ok(Self::Modified),
            _ => Err(DeliveryStateParseError(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown delivery state: {0}")]
pub struct DeliveryStateParseError(String);

/// One in-flight incoming message transfer.
#[derive(Debug, Clone)]
pub struct Delivery {
    tag: Bytes,
    buffer: BytesMut,
    partial: bool,
    readable: bool,
    done: bool,
    settled: bool,
    local: Option<DeliveryState>,
    remote: Option<DeliveryState>,
    remote_settled: bool,
    updated: bool,
}

impl Delivery {
    pub(crate) fn new(tag: Bytes) -> Self {
        Self {
            tag,
            buffer: BytesMut::new(),
            partial: true,
            readable: false,
            done: false,
            settled: false,
            local: None,
            remote: None,
            remote_settled: false,
            updated: false,
        }
    }

    /// Delivery tag assigned by the sender
    pub fn tag(&self) -> &Bytes {
        &self.tag
    }

    /// Bytes received but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// More transfer frames are expected for this delivery.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Current on its link, so `recv` reads from it.
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Retired from its link's current slot.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Settled locally
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Settled by the peer
    pub fn is_remote_settled(&self) -> bool {
        self.remote_settled
    }

    /// Disposition set by this side, if any
    pub fn local_state(&self) -> Option<DeliveryState> {
        self.local
    }

    /// Disposition reported by the peer, if any
    pub fn remote_state(&self) -> Option<DeliveryState> {
        self.remote
    }

    /// The peer changed the remote disposition since the last [`clear`](Self::clear).
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Reset the peer-updated flag
    pub fn clear(&mut self) {
        self.updated = false;
    }

    /// Append transfer bytes. Ignored once the delivery is done.
    pub(crate) fn push(&mut self, data: &[u8], more: bool) -> bool {
        if self.done {
            return false;
        }
        self.buffer.extend_from_slice(data);
        self.partial = more;
        true
    }

    /// Copy up to `buf.len()` pending bytes into `buf`, returning the count.
    pub(crate) fn recv(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.advance(n);
        n
    }

    /// Retire the delivery, discarding whatever was left unread.
    ///
    /// Returns the number of bytes that were still pending.
    pub(crate) fn set_done(&mut self) -> usize {
        let remaining = self.buffer.len();
        self.done = true;
        self.readable = false;
        self.buffer = BytesMut::new();
        remaining
    }

    pub(crate) fn set_readable(&mut self) {
        if !self.done {
            self.readable = true;
        }
    }

    pub(crate) fn set_local_state(&mut self, state: DeliveryState) {
        self.local = Some(state);
    }

    pub(crate) fn settle(&mut self) {
        self.settled = true;
    }

    pub(crate) fn set_remote(&mut self, state: Option<DeliveryState>, settled: bool) {
        if state.is_some() {
            self.remote = state;
        }
        self.remote_settled |= settled;
        self.updated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_bounded_by_pending_and_buffer() {
        let mut delivery = Delivery::new(Bytes::from_static(b"t1"));
        delivery.push(b"hello", false);
        assert_eq!(delivery.pending(), 5);

        let mut buf = [0u8; 3];
        assert_eq!(delivery.recv(&mut buf), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(delivery.pending(), 2);

        let mut buf = [0u8; 8];
        assert_eq!(delivery.recv(&mut buf), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(delivery.recv(&mut buf), 0);
    }

    #[test]
    fn test_done_discards_and_freezes() {
        let mut delivery = Delivery::new(Bytes::from_static(b"t1"));
        delivery.push(b"abcdef", true);
        assert!(delivery.is_partial());
        delivery.set_readable();
        assert!(delivery.is_readable());

        assert_eq!(delivery.set_done(), 6);
        assert!(delivery.is_done());
        assert!(!delivery.is_readable());
        delivery.set_readable();
        assert!(!delivery.is_readable());
        assert_eq!(delivery.pending(), 0);
        assert!(!delivery.push(b"more", false));
        assert_eq!(delivery.pending(), 0);
    }

    #[test]
    fn test_remote_update_and_clear() {
        let mut delivery = Delivery::new(Bytes::from_static(b"t1"));
        assert!(!delivery.is_updated());

        delivery.set_remote(Some(DeliveryState::Accepted), true);
        assert!(delivery.is_updated());
        assert!(delivery.is_remote_settled());
        assert_eq!(delivery.remote_state(), Some(DeliveryState::Accepted));

        delivery.clear();
        assert!(!delivery.is_updated());
    }

    #[test]
    fn test_state_parse() {
        assert_eq!("Accepted".parse::<DeliveryState>().unwrap(), DeliveryState::Accepted);
        assert!("bogus".parse::<DeliveryState>().is_err());
        assert_eq!(DeliveryState::Released.to_string(), "released");
    }
}
