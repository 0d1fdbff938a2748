//! # rewind-replay
//!
//! Delivery core of the gateway.
//!
//! - [`transport`]: the [`Transport`] sink contract and a channel-backed
//!   implementation the server pumps into sockets and response bodies
//! - [`connection`]: one client, its replay window and accumulated filters
//! - [`delivery`]: the backpressure-aware [`DeliveryLoop`]
//! - [`session`] / [`coordinator`]: grace-period sessions with a fast
//!   single-connection path and a synchronized multi-connection path
//! - [`combined`]: strict timestamp merge of several venues into one transport
//! - [`live`]: live relay with bounded backpressure and an error budget
//!
//! Every failure is contained at the session or connection that caused it
//! and reaches clients as a close code and reason.

#![deny(unsafe_code)]

pub mod combined;
pub mod connection;
pub mod coordinator;
pub mod delivery;
pub mod errors;
pub mod live;
pub mod metrics;
pub mod session;
pub mod transport;

pub use combined::{COMBINED_FINISHED, prepare_combined, run_combined};
pub use connection::{Connection, ConnectionId, ControlOutcome};
pub use coordinator::{SessionConfig, SessionCoordinator};
pub use delivery::{BackpressurePolicy, Delivery, DeliveryConfig, DeliveryLoop, Framing, Health};
pub use errors::{Closure, ReplayError, Result};
pub use live::{LiveConfig, STREAM_FINISHED, prepare_live, run_live};
pub use session::{ReplaySession, SessionKey, SessionState};
pub use transport::{ChannelTransport, Outbound, OutboundReceiver, Transport};
