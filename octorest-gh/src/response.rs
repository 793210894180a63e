//! # Responses
//!
//! What comes back from the wire ([`ResponseEnvelope`]) and what a logical
//! call hands back to its caller ([`InvokeOutput`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::consts::{
  HEADER_RATE_LIMIT_LIMIT, HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET, HEADER_RATE_LIMIT_RESOURCE,
  HEADER_REQUEST_ID,
};
use crate::pagination::next_page_cursor;

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResponseHeaders(BTreeMap<String, Vec<String>>);

impl ResponseHeaders {
  pub fn from_header_map(map: &HeaderMap) -> Self {
    let mut headers = Self::default();
    for (name, value) in map {
      // Non-UTF-8 values are kept lossily rather than dropped
      headers.insert(name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
    }
    headers
  }

  pub fn insert(&mut self, name: &str, value: &str) {
    self.0.entry(name.to_ascii_lowercase()).or_default().push(value.to_string());
  }

  /// First value of a header, matched case-insensitively
  pub fn get(&self, name: &str) -> Option<&str> {
    self.get_all(name).first().map(String::as_str)
  }

  pub fn get_all(&self, name: &str) -> &[String] {
    self.0.get(&name.to_ascii_lowercase()).map_or(&[], Vec::as_slice)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
    self.0.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// One successful physical response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
  pub status: u16,
  pub headers: ResponseHeaders,
  /// Parsed JSON; non-JSON text is a JSON string and an empty body is null
  pub body: Value,
  /// 1-based page position when the response is part of a paginated call
  pub page: Option<usize>,
}

/// Snapshot of the `x-ratelimit-*` headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
  pub limit: Option<u64>,
  pub remaining: Option<u64>,
  pub reset: Option<DateTime<Utc>>,
  pub resource: Option<String>,
}

impl RateLimitInfo {
  /// `None` when the response carried no rate-limit headers at all
  pub fn from_headers(headers: &ResponseHeaders) -> Option<Self> {
    let number = |name: &str| headers.get(name).and_then(|v| v.trim().parse::<u64>().ok());

    let info = Self {
      limit: number(HEADER_RATE_LIMIT_LIMIT),
      remaining: number(HEADER_RATE_LIMIT_REMAINING),
      reset: number(HEADER_RATE_LIMIT_RESET)
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
      resource: headers.get(HEADER_RATE_LIMIT_RESOURCE).map(str::to_string),
    };

    (info.limit.is_some() || info.remaining.is_some() || info.reset.is_some()).then_some(info)
  }

  /// Remaining budget is below 10% of the limit
  pub fn is_low(&self) -> bool {
    match (self.limit, self.remaining) {
      (Some(limit), Some(remaining)) => limit > 0 && remaining.saturating_mul(10) < limit,
      _ => false,
    }
  }
}

/// Response metadata returned when a caller asks for an extended result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMeta {
  pub status: u16,
  pub headers: ResponseHeaders,
  pub request_id: Option<String>,
  pub next_link: Option<String>,
  pub etag: Option<String>,
  pub last_modified: Option<String>,
  pub rate_limit: Option<RateLimitInfo>,
}

impl ResponseMeta {
  pub fn from_envelope(envelope: &ResponseEnvelope) -> Self {
    let headers = &envelope.headers;
    Self {
      status: envelope.status,
      request_id: headers.get(HEADER_REQUEST_ID).map(str::to_string),
      next_link: next_page_cursor(headers).map(|cursor| cursor.to_string()),
      etag: headers.get("etag").map(str::to_string),
      last_modified: headers.get("last-modified").map(str::to_string),
      rate_limit: RateLimitInfo::from_headers(headers),
      headers: headers.clone(),
    }
  }
}

/// Counters for one logical call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
  /// Requests actually put on the wire, retries included
  pub physical_requests: u32,
  pub retries: u32,
  pub pages: usize,
}

impl CallStats {
  pub(crate) fn absorb(&mut self, other: CallStats) {
    self.physical_requests += other.physical_requests;
    self.retries += other.retries;
    self.pages += other.pages;
  }
}

/// Result of a logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOutput {
  /// Response body; for paginated calls, every item in server order
  pub body: Value,
  /// Present only when the call asked for an extended result. For
  /// paginated calls it describes the last page.
  pub meta: Option<ResponseMeta>,
  pub stats: CallStats,
}
