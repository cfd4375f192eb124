//! Link credit accounting.
//!
//! Credit-based flow control limits the number of deliveries a peer may send
//! on a link. The receiving side grants credit with `flow`, the peer spends it
//! by sending transfers, and the application gives it back up by advancing
//! past each delivery.

/// Returned by [`CreditLedger::consume_one`] when a decrement had to be
/// clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("credit would drop below zero")]
    CreditUnderflow,

    #[error("queued count would drop below zero")]
    QueuedUnderflow,

    #[error("credit and queued count would both drop below zero")]
    BothUnderflow,
}

/// Per-link credit ledger.
///
/// Pure bookkeeping: the ledger never performs I/O. `credit` and `queued` are
/// protocol-visible and never go below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditLedger {
    credit: u32,
    queued: u32,
    drain: bool,
    unsent: u32,
}

impl CreditLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `n` credits. Clears drain mode.
    pub fn grant(&mut self, n: u32) {
        self.credit = self.credit.saturating_add(n);
        self.unsent = self.unsent.saturating_add(n);
        self.drain = false;
    }

    /// Read and reset the credit granted since the last call.
    pub fn take_unsent(&mut self) -> u32 {
        std::mem::take(&mut self.unsent)
    }

    /// Credit granted but not yet taken by the encoding layer.
    pub fn unsent(&self) -> u32 {
        self.unsent
    }

    /// Record that one delivery has arrived from the peer.
    pub fn delivery_queued(&mut self) {
        self.queued = self.queued.saturating_add(1);
    }

    /// Retire one queued delivery, spending one credit.
    ///
    /// Both counters are clamped at zero. If either had to be clamped the
    /// decrement is still applied to the other one and the violation is
    /// returned for the caller to report.
    pub fn consume_one(&mut self) -> Result<(), LedgerError> {
        let credit_ok = self.credit > 0;
        let queued_ok = self.queued > 0;
        self.credit = self.credit.saturating_sub(1);
        self.queued = self.queued.saturating_sub(1);

        match (credit_ok, queued_ok) {
            (true, true) => Ok(()),
            (false, true) => Err(LedgerError::CreditUnderflow),
            (true, false) => Err(LedgerError::QueuedUnderflow),
            (false, false) => Err(LedgerError::BothUnderflow),
        }
    }

    /// Set or clear drain mode without touching credit.
    pub fn set_drain(&mut self, drain: bool) {
        self.drain = drain;
    }

    /// A drain was requested and the peer still holds more credit than it
    /// has used on queued deliveries.
    pub fn is_draining(&self) -> bool {
        self.drain && self.credit > self.queued
    }

    /// Credit the peer may still spend
    pub fn credit(&self) -> u32 {
        self.credit
    }

    /// Deliveries received but not yet advanced past
    pub fn queued(&self) -> u32 {
        self.queued
    }

    /// Whether drain mode is set
    pub fn drain(&self) -> bool {
        self.drain
    }
}
