//! Sessions: the owner of the incoming window and of every receiving link.
//!
//! The frame-decoding layer reports arrivals through [`Session::transfer`]
//! and [`Session::remote_disposition`]. The frame-encoding layer collects
//! links that need an outbound flow with [`Session::take_flow_updates`].
//! Applications reach a link through [`Session::receiver_mut`].

use std::collections::VecDeque;

use bytes::Bytes;
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::config::{ReceiverConfig, SessionConfig};
use crate::delivery::{DeliveryId, DeliveryState};
use crate::error::{EngineError, Result};
use crate::flow::FlowUpdate;
use crate::link::{Receiver, ReceiverMut};
use crate::window::SessionWindow;

slotmap::new_key_type! {
    /// Handle to a receiving link within its session.
    pub struct LinkId;
}

/// One session and its receiving links.
#[derive(Debug, Default)]
pub struct Session {
    window: SessionWindow,
    links: SlotMap<LinkId, Receiver>,
    /// Modified links, in the order they were first marked.
    work: VecDeque<LinkId>,
}

impl Session {
    /// Create a session with the configured starting window
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            window: SessionWindow::new(config.incoming_bytes, config.incoming_deliveries),
            links: SlotMap::with_key(),
            work: VecDeque::new(),
        }
    }

    /// The incoming window shared by all links
    pub fn window(&self) -> &SessionWindow {
        &self.window
    }

    /// Attach a receiving link, granting its initial credit if configured.
    pub fn attach_receiver(&mut self, config: ReceiverConfig) -> Result<LinkId> {
        config.validate()?;
        let id = self.links.insert(Receiver::new(config.name));
        debug!(link = ?id, initial_credit = config.initial_credit, "receiver attached");

        if config.initial_credit > 0 {
            self.receiver_mut(id)?.flow(config.initial_credit);
        }
        Ok(id)
    }

    /// Read-only access to a receiving link
    pub fn receiver(&self, id: LinkId) -> Option<&Receiver> {
        self.links.get(id)
    }

    /// Mutable access to a receiving link and the session window
    pub fn receiver_mut(&mut self, id: LinkId) -> Result<ReceiverMut<'_>> {
        let link = self.links.get_mut(id).ok_or(EngineError::UnknownLink(id))?;
        Ok(ReceiverMut {
            id,
            link,
            window: &mut self.window,
            work: &mut self.work,
        })
    }

    /// Iterate over all attached receiving links
    pub fn receivers(&self) -> impl Iterator<Item = (LinkId, &Receiver)> + '_ {
        self.links.iter()
    }

    /// Whether the link is waiting in the outbound work queue
    pub fn is_modified(&self, id: LinkId) -> bool {
        self.links.get(id).is_some_and(Receiver::is_modified)
    }

    /// Record a transfer frame received on `link`.
    ///
    /// A new tag opens and queues a delivery; a tag matching the link's newest
    /// partial delivery continues it. Bytes for a delivery the application
    /// already advanced past are dropped and not charged to the window.
    pub fn transfer(
        &mut self,
        link: LinkId,
        tag: impl Into<Bytes>,
        data: &[u8],
        more: bool,
    ) -> Result<DeliveryId> {
        let receiver = self
            .links
            .get_mut(link)
            .ok_or(EngineError::UnknownLink(link))?;
        let transfer = receiver.transfer(tag.into(), data, more);

        if transfer.new {
            self.window.adjust_deliveries(1);
        }
        if transfer.buffered > 0 {
            self.window.adjust_bytes(transfer.buffered as i64);
        } else if !data.is_empty() {
            warn!(
                link = %receiver.name(),
                dropped = data.len(),
                "transfer for retired delivery dropped"
            );
        }
        Ok(transfer.delivery)
    }

    /// Record a disposition frame from the peer.
    pub fn remote_disposition(
        &mut self,
        link: LinkId,
        delivery: DeliveryId,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<()> {
        self.links
            .get_mut(link)
            .ok_or(EngineError::UnknownLink(link))?
            .remote_disposition(delivery, state, settled)
    }

    /// Apply a peer window update to the byte accumulator.
    pub fn adjust_incoming_bytes(&mut self, delta: i64) {
        self.window.adjust_bytes(delta);
    }

    /// Apply a peer window update to the delivery accumulator.
    pub fn adjust_incoming_deliveries(&mut self, delta: i64) {
        self.window.adjust_deliveries(delta);
    }

    /// Drain the modified-link queue.
    ///
    /// Each modified link yields one update and has its signal cleared and its
    /// unsent credit taken.
    pub fn take_flow_updates(&mut self) -> Vec<FlowUpdate> {
        let mut updates = Vec::with_capacity(self.work.len());
        while let Some(id) = self.work.pop_front() {
            let Some(link) = self.links.get_mut(id) else {
                continue;
            };
            link.clear_modified();
            let credit_delta = link.ledger_mut().take_unsent();
            updates.push(FlowUpdate {
                link: id,
                name: link.name().to_string(),
                credit: link.credit(),
                queued: link.queued(),
                drain: link.is_drain(),
                credit_delta,
                incoming_bytes: self.window.incoming_bytes(),
                incoming_deliveries: self.window.incoming_deliveries(),
            });
        }
        updates
    }

    /// Detach and free a receiving link.
    ///
    /// Deliveries still queued on the link are taken off the session window
    /// so the remaining links are not charged for them.
    pub fn free_receiver(&mut self, id: LinkId) -> Result<()> {
        let link = self.links.remove(id).ok_or(EngineError::UnknownLink(id))?;
        let (bytes, deliveries) = link.outstanding();
        self.window.adjust_bytes(-(bytes as i64));
        self.window.adjust_deliveries(-(deliveries as i64));
        self.work.retain(|&w| w != id);
        debug!(link = %link.name(), bytes, deliveries, "receiver freed");
        Ok(())
    }
}
