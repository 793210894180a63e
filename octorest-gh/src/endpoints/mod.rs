//! # GitHub API Endpoints
//!
//! Resource wrappers built on [`GitHubClient::invoke`](crate::GitHubClient::invoke).
//! Each one validates its inputs, builds a URI fragment, attaches telemetry
//! metadata and decodes the result; the engine does the rest.

pub mod assignees;
pub mod users;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a response body into a typed model
pub(crate) fn decode<T: DeserializeOwned>(body: Value, what: &str) -> Result<T> {
  serde_json::from_value(body).with_context(|| format!("Failed to parse {what}"))
}
