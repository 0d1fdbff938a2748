//! # rewind-mappers
//!
//! Each supported venue has one [`SubscriptionMapper`] that recognizes the
//! venue's native subscribe message and translates it into canonical
//! [`Filter`](rewind_core::Filter)s. Mappers are stateless unit values; the
//! [`registry`] resolves them by venue name.
//!
//! ```ignore
//! let mapper = rewind_mappers::mapper_for("bitmex").unwrap();
//! let msg = serde_json::json!({"op": "subscribe", "args": ["trade:XBTUSD"]});
//! assert!(mapper.can_handle(&msg, window_start));
//! let filters = mapper.map(&msg, window_start)?;
//! ```

#![deny(unsafe_code)]

pub mod errors;
mod json;
pub mod mapper;
pub mod registry;
pub mod venues;

pub use errors::{MappingError, Result};
pub use mapper::SubscriptionMapper;
pub use registry::{SUPPORTED_EXCHANGES, is_supported, mapper_for};
