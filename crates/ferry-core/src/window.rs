//! Session incoming window tracking.
//!
//! The window is shared by every receiving link on a session. It is an
//! accounting ledger rather than a limiter: both counters are signed and may
//! pass through zero.

/// Incoming byte and delivery accumulators for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionWindow {
    incoming_bytes: i64,
    incoming_deliveries: i64,
}

impl SessionWindow {
    /// Create a window with the given starting accumulators
    pub fn new(incoming_bytes: i64, incoming_deliveries: i64) -> Self {
        Self {
            incoming_bytes,
            incoming_deliveries,
        }
    }

    /// Apply a signed delta to the byte accumulator.
    pub fn adjust_bytes(&mut self, delta: i64) {
        self.incoming_bytes = self.incoming_bytes.saturating_add(delta);
    }

    /// Apply a signed delta to the delivery accumulator.
    pub fn adjust_deliveries(&mut self, delta: i64) {
        self.incoming_deliveries = self.incoming_deliveries.saturating_add(delta);
    }

    /// True only when the byte accumulator sits at exactly zero.
    pub fn is_byte_window_exhausted(&self) -> bool {
        self.incoming_bytes == 0
    }

    /// Current byte accumulator
    pub fn incoming_bytes(&self) -> i64 {
        self.incoming_bytes
    }

    /// Current delivery accumulator
    pub fn incoming_deliveries(&self) -> i64 {
        self.incoming_deliveries
    }
}
