//! Flow-control and delivery-consumption core of the Ferry messaging engine.
//!
//! This crate governs how many messages a receiving link may accept and how
//! much payload a session has buffered:
//! - Link credit ledger (granted credit, queued deliveries, drain mode)
//! - Session incoming window shared by all links on a session
//! - Delivery consumption (`recv`/`advance`) keeping both consistent
//! - Flow updates for the frame-encoding layer
//!
//! Frame encoding, connection and session negotiation are left to the
//! embedding engine. Every operation is synchronous; callers serialize access
//! to a [`Session`].
//!
//! # Example
//!
//! ```rust
//! use ferry_core::{ReceiverConfig, Session, SessionConfig};
//!
//! let mut session = Session::new(&SessionConfig::default());
//! let link = session.attach_receiver(ReceiverConfig::new("orders")).unwrap();
//!
//! session.receiver_mut(link).unwrap().flow(10);
//! session.transfer(link, &b"tag-1"[..], b"hello", false).unwrap();
//!
//! let mut receiver = session.receiver_mut(link).unwrap();
//! let mut buf = [0u8; 16];
//! let n = receiver.recv(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! assert!(receiver.advance());
//! assert_eq!(receiver.credit(), 9);
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod flow;
pub mod flow_control;
pub mod link;
pub mod session;
pub mod window;

pub use config::{ReceiverConfig, SessionConfig};
pub use delivery::{Delivery, DeliveryId, DeliveryState};
pub use error::{EngineError, Result};
pub use flow::FlowUpdate;
pub use flow_control::{CreditLedger, LedgerError};
pub use link::{Receiver, ReceiverMut};
pub use session::{LinkId, Session};
pub use window::SessionWindow;
