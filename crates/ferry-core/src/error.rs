//! Error types for the flow-control core.

use crate::delivery::DeliveryId;
use crate::flow_control::LedgerError;
use crate::session::LinkId;

/// Ferry engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `recv` was called on a link that has no current delivery.
    #[error("no current delivery on link {link:?}")]
    NoCurrentDelivery { link: LinkId },

    #[error("unknown link: {0:?}")]
    UnknownLink(LinkId),

    #[error("unknown delivery: {0:?}")]
    UnknownDelivery(DeliveryId),

    #[error("delivery already settled: {0:?}")]
    AlreadySettled(DeliveryId),

    /// The credit ledger was asked to go below zero.
    #[error("ledger consistency violation: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether the error reports misuse by the caller rather than broken
    /// internal bookkeeping.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::Ledger(_))
    }
}
