//! Request options accepted by the HTTP and WebSocket routes.
//!
//! Options arrive as a JSON document in the `options` query parameter and
//! may be a single object or an array of objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::WindowError;
use crate::filter::Filter;
use crate::source::ReplayRequest;
use crate::window::ReplayWindow;

/// A single value or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// One value.
    One(T),
    /// Several values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Historical replay of one venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOptions {
    /// Venue identifier.
    pub exchange: String,
    /// Window start.
    pub from: String,
    /// Window end.
    pub to: String,
    /// Channels and symbols; empty selects everything.
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl ReplayOptions {
    /// Validate and convert into a source request.
    pub fn into_request(self) -> Result<ReplayRequest, WindowError> {
        let window = ReplayWindow::parse(self.exchange, &self.from, &self.to)?;
        Ok(ReplayRequest::new(window, self.filters))
    }
}

/// Live streaming of one venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    /// Venue identifier.
    pub exchange: String,
    /// Native subscribe messages, forwarded upstream verbatim.
    #[serde(default)]
    pub subscriptions: Vec<Value>,
}

/// Parse an `options` query value.
pub fn parse_options<T: serde::de::DeserializeOwned>(raw: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str::<OneOrMany<T>>(raw).map(OneOrMany::into_vec)
}
