//! Outbound flow state handed to the frame-encoding layer.

use serde::Serialize;

use crate::session::LinkId;

/// Snapshot of one modified link, taken when the session's work queue is drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowUpdate {
    #[serde(skip)]
    pub link: LinkId,
    /// Link name
    pub name: String,
    pub credit: u32,
    pub queued: u32,
    pub drain: bool,
    /// Credit granted since the previous update for this link
    pub credit_delta: u32,
    pub incoming_bytes: i64,
    pub incoming_deliveries: i64,
}

impl FlowUpdate {
    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
