//! Receiving links.
//!
//! A [`Receiver`] owns its credit ledger and the deliveries the peer has sent
//! on it. Operations that also touch the session window go through
//! [`ReceiverMut`], a handle borrowed from the owning
//! [`Session`](crate::session::Session).

use std::collections::VecDeque;
use std::ops::Deref;

use bytes::Bytes;
use slotmap::SlotMap;
use tracing::{debug, error, trace};

use crate::delivery::{Delivery, DeliveryId, DeliveryState};
use crate::error::{EngineError, Result};
use crate::flow_control::CreditLedger;
use crate::session::LinkId;
use crate::window::SessionWindow;

/// An incoming link attached to a session.
#[derive(Debug)]
pub struct Receiver {
    name: String,
    ledger: CreditLedger,
    deliveries: SlotMap<DeliveryId, Delivery>,
    /// Arrived and not yet advanced past. The front is the current delivery.
    queue: VecDeque<DeliveryId>,
    /// Not yet locally settled, in arrival order.
    unsettled: VecDeque<DeliveryId>,
    /// Most recently arrived delivery, for matching continuation transfers.
    last: Option<DeliveryId>,
    modified: bool,
}

impl Receiver {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            ledger: CreditLedger::new(),
            deliveries: SlotMap::with_key(),
            queue: VecDeque::new(),
            unsettled: VecDeque::new(),
            last: None,
            modified: false,
        }
    }

    /// Link name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The link's credit ledger
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Credit the peer may still spend
    pub fn credit(&self) -> u32 {
        self.ledger.credit()
    }

    /// Deliveries received but not yet advanced past
    pub fn queued(&self) -> u32 {
        self.ledger.queued()
    }

    /// Drain flag as last set by `flow`/`drain`.
    pub fn is_drain(&self) -> bool {
        self.ledger.drain()
    }

    /// Credit granted since the last flow update
    pub fn unsent_credit(&self) -> u32 {
        self.ledger.unsent()
    }

    /// See [`CreditLedger::is_draining`].
    pub fn is_draining(&self) -> bool {
        self.ledger.is_draining()
    }

    /// An outbound update describing this link should be sent.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// The delivery `recv` reads from, if any.
    pub fn current(&self) -> Option<DeliveryId> {
        self.queue.front().copied()
    }

    /// Look up a delivery by handle
    pub fn delivery(&self, id: DeliveryId) -> Option<&Delivery> {
        self.deliveries.get(id)
    }

    /// At least one arrived delivery has not been advanced past.
    pub fn has_incoming(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Deliveries not yet settled locally, oldest first.
    ///
    /// The iterator borrows the link, so it reflects the link exactly as it
    /// was when called and cannot observe later mutation.
    pub fn unsettled(&self) -> impl Iterator<Item = (DeliveryId, &Delivery)> + '_ {
        self.unsettled
            .iter()
            .filter_map(move |&id| self.deliveries.get(id).map(|d| (id, d)))
    }

    /// Number of deliveries not yet settled locally
    pub fn unsettled_count(&self) -> usize {
        self.unsettled.len()
    }

    /// Record transfer bytes from the peer.
    ///
    /// Returns the delivery the bytes belong to and how many bytes were
    /// buffered (0 if the delivery was already retired). `new` is true if the
    /// transfer opened a delivery.
    pub(crate) fn transfer(&mut self, tag: Bytes, data: &[u8], more: bool) -> Transfer {
        let continuing = self
            .last
            .and_then(|id| self.deliveries.get(id).map(|d| (id, d)))
            .filter(|(_, d)| d.is_partial() && *d.tag() == tag)
            .map(|(id, _)| id);

        let (id, new) = match continuing {
            Some(id) => (id, false),
            None => {
                let id = self.deliveries.insert(Delivery::new(tag));
                self.queue.push_back(id);
                self.unsettled.push_back(id);
                self.last = Some(id);
                self.ledger.delivery_queued();
                (id, true)
            }
        };

        let buffered = match self.deliveries.get_mut(id) {
            Some(delivery) => {
                if delivery.push(data, more) {
                    data.len()
                } else {
                    0
                }
            }
            None => 0,
        };
        self.mark_current_readable();
        Transfer {
            delivery: id,
            new,
            buffered,
        }
    }

    pub(crate) fn remote_disposition(
        &mut self,
        id: DeliveryId,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<()> {
        let delivery = self
            .deliveries
            .get_mut(id)
            .ok_or(EngineError::UnknownDelivery(id))?;
        delivery.set_remote(state, settled);
        Ok(())
    }

    /// Pending bytes and count of deliveries still queued.
    pub(crate) fn outstanding(&self) -> (usize, usize) {
        let bytes: usize = self
            .queue
            .iter()
            .filter_map(|&id| self.deliveries.get(id))
            .map(Delivery::pending)
            .sum();
        (bytes, self.queue.len())
    }

    /// Flag whichever delivery is now at the front of the queue as readable.
    fn mark_current_readable(&mut self) {
        if let Some(id) = self.current() {
            if let Some(delivery) = self.deliveries.get_mut(id) {
                delivery.set_readable();
            }
        }
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut CreditLedger {
        &mut self.ledger
    }
}

/// Result of buffering one transfer frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transfer {
    pub delivery: DeliveryId,
    pub new: bool,
    pub buffered: usize,
}

/// Mutable access to a receiver together with its session's window.
pub struct ReceiverMut<'a> {
    pub(crate) id: LinkId,
    pub(crate) link: &'a mut Receiver,
    pub(crate) window: &'a mut SessionWindow,
    pub(crate) work: &'a mut VecDeque<LinkId>,
}

impl<'a> ReceiverMut<'a> {
    /// Handle of the link within its session
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Read pending bytes of the current delivery into `buf`.
    ///
    /// Returns the number of bytes copied, at most `buf.len()`. Returns 0 when
    /// the current delivery has nothing buffered.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let id = self
            .link
            .current()
            .ok_or(EngineError::NoCurrentDelivery { link: self.id })?;
        let delivery = self
            .link
            .deliveries
            .get_mut(id)
            .ok_or(EngineError::UnknownDelivery(id))?;

        let consumed = delivery.recv(buf);
        if consumed > 0 {
            self.window.adjust_bytes(-(consumed as i64));
            trace!(link = %self.link.name, consumed, "recv");
            if self.window.is_byte_window_exhausted() {
                trace!(link = %self.link.name, "session byte window exhausted");
                self.mark_modified();
            }
        }
        Ok(consumed)
    }

    /// Retire the current delivery and move to the next queued one.
    ///
    /// Unread bytes of the retired delivery are discarded. Returns false if
    /// there was no current delivery. A credit ledger that had to clamp at
    /// zero is logged; use [`try_advance`](Self::try_advance) to observe it.
    pub fn advance(&mut self) -> bool {
        match self.try_advance() {
            Ok(advanced) => advanced,
            Err(err) => {
                error!(link = %self.link.name, %err, "credit ledger clamped on advance");
                true
            }
        }
    }

    /// Like [`advance`](Self::advance), but reports a clamped credit ledger
    /// as [`EngineError::Ledger`]. The advance has been applied either way.
    pub fn try_advance(&mut self) -> Result<bool> {
        let Some(id) = self.link.queue.pop_front() else {
            return Ok(false);
        };

        let (remaining, settled) = match self.link.deliveries.get_mut(id) {
            Some(delivery) => (delivery.set_done(), delivery.is_settled()),
            None => (0, false),
        };
        if settled {
            self.link.deliveries.remove(id);
        }
        self.link.mark_current_readable();

        let consumed = self.link.ledger.consume_one();
        self.window.adjust_bytes(-(remaining as i64));
        self.window.adjust_deliveries(-1);
        trace!(
            link = %self.link.name,
            discarded = remaining,
            credit = self.link.ledger.credit(),
            queued = self.link.ledger.queued(),
            "advance"
        );

        if self.window.is_byte_window_exhausted() {
            self.mark_modified();
        }
        consumed?;
        Ok(true)
    }

    /// Grant `credits` to the peer. Clears drain mode.
    pub fn flow(&mut self, credits: u32) {
        self.mark_modified();
        self.link.ledger.grant(credits);
        debug!(link = %self.link.name, credits, total = self.link.ledger.credit(), "flow");
    }

    /// Grant `credits` and ask the peer to use or return all outstanding credit.
    pub fn drain(&mut self, credits: u32) {
        self.flow(credits);
        self.link.ledger.set_drain(true);
        debug!(link = %self.link.name, credits, "drain requested");
    }

    /// Set the local disposition of a delivery.
    pub fn disposition(&mut self, id: DeliveryId, state: DeliveryState) -> Result<()> {
        let delivery = self
            .link
            .deliveries
            .get_mut(id)
            .ok_or(EngineError::UnknownDelivery(id))?;
        if delivery.is_settled() {
            return Err(EngineError::AlreadySettled(id));
        }
        delivery.set_local_state(state);
        self.mark_modified();
        Ok(())
    }

    /// Settle a delivery locally.
    ///
    /// Settling the current delivery advances the link first. A settled
    /// delivery is released once it is no longer queued; its id goes stale.
    pub fn settle(&mut self, id: DeliveryId) -> Result<()> {
        match self.link.deliveries.get(id) {
            None => return Err(EngineError::UnknownDelivery(id)),
            Some(d) if d.is_settled() => return Err(EngineError::AlreadySettled(id)),
            Some(_) => {}
        }

        if self.link.current() == Some(id) {
            self.advance();
        }

        let done = match self.link.deliveries.get_mut(id) {
            Some(delivery) => {
                delivery.settle();
                delivery.is_done()
            }
            None => false,
        };
        if done {
            self.link.deliveries.remove(id);
        }
        self.link.unsettled.retain(|&u| u != id);
        self.mark_modified();
        Ok(())
    }

    /// Clear the peer-updated flag of a delivery.
    pub fn clear(&mut self, id: DeliveryId) -> Result<()> {
        self.link
            .deliveries
            .get_mut(id)
            .map(Delivery::clear)
            .ok_or(EngineError::UnknownDelivery(id))
    }

    fn mark_modified(&mut self) {
        if !self.link.modified {
            self.link.modified = true;
            self.work.push_back(self.id);
        }
    }
}

impl Deref for ReceiverMut<'_> {
    type Target = Receiver;

    fn deref(&self) -> &Receiver {
        self.link
    }
}
