//! # rewind-server
//!
//! HTTP and WebSocket surface of the replay gateway.
//!
//! - `GET /replay`: NDJSON replay over HTTP
//! - `GET /ws-replay`: synchronized replay driven by native subscribe messages
//! - `GET /ws-replay-combined`: several venues merged by timestamp
//! - `GET /ws-stream`: live relay from venue APIs
//! - `GET /health`, `GET /metrics`, `GET /api/v1/schema/websocketHelp`

#![deny(unsafe_code)]

pub mod errors;
pub mod health;
pub mod metrics;
pub mod pump;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use errors::{ApiError, ServerError};
pub use server::{AppState, RewindServer};
pub use shutdown::ShutdownCoordinator;
