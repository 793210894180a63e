//! # Telemetry
//!
//! One structured event per logical call, handed to a pluggable
//! [`TelemetrySink`]. Recording never fails the call: a sink that panics is
//! contained and logged.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::response::CallStats;

/// How a logical call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  Success,
  Failure {
    /// Failure class, e.g. `not_found`
    kind: String,
    status: Option<u16>,
  },
}

impl Outcome {
  pub const fn is_success(&self) -> bool {
    matches!(self, Outcome::Success)
  }
}

/// Record of one logical call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
  pub id: Uuid,
  pub timestamp: DateTime<Utc>,
  pub event_name: String,
  pub properties: BTreeMap<String, String>,
  pub outcome: Outcome,
  pub elapsed: Duration,
  /// Request, retry and page counts; only for successful calls
  pub stats: Option<CallStats>,
}

impl TelemetryEvent {
  pub fn new(
    event_name: impl Into<String>,
    properties: BTreeMap<String, String>,
    outcome: Outcome,
    elapsed: Duration,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      timestamp: Utc::now(),
      event_name: event_name.into(),
      properties,
      outcome,
      elapsed,
      stats: None,
    }
  }

  pub const fn with_stats(mut self, stats: CallStats) -> Self {
    self.stats = Some(stats);
    self
  }
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync {
  fn record(&self, event: TelemetryEvent);
}

/// Emits events as `tracing` events on the `octorest::telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
  fn record(&self, event: TelemetryEvent) {
    let (kind, status) = match &event.outcome {
      Outcome::Success => ("success", None),
      Outcome::Failure { kind, status } => (kind.as_str(), *status),
    };
    info!(
      target: "octorest::telemetry",
      event_id = %event.id,
      event_name = %event.event_name,
      outcome = kind,
      status = ?status,
      elapsed_ms = u64::try_from(event.elapsed.as_millis()).unwrap_or(u64::MAX),
      requests = event.stats.map(|s| s.physical_requests),
      retries = event.stats.map(|s| s.retries),
      pages = event.stats.map(|s| s.pages),
      properties = ?event.properties,
      "telemetry"
    );
  }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
  fn record(&self, _event: TelemetryEvent) {}
}

/// Keeps events in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryTelemetry {
  events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl MemoryTelemetry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<TelemetryEvent> {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn len(&self) -> usize {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl TelemetrySink for MemoryTelemetry {
  fn record(&self, event: TelemetryEvent) {
    self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
  }
}

/// Fire-and-forget front for a [`TelemetrySink`].
#[derive(Clone)]
pub struct TelemetryEmitter {
  sink: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for TelemetryEmitter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TelemetryEmitter").finish_non_exhaustive()
  }
}

impl Default for TelemetryEmitter {
  fn default() -> Self {
    Self::new(Arc::new(TracingTelemetry))
  }
}

impl TelemetryEmitter {
  pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
    Self { sink }
  }

  /// Emitter for the configured telemetry setting
  pub fn for_config(disabled: bool) -> Self {
    if disabled {
      Self::new(Arc::new(NoopTelemetry))
    } else {
      Self::default()
    }
  }

  pub fn record(&self, event: TelemetryEvent) {
    let name = event.event_name.clone();
    if catch_unwind(AssertUnwindSafe(|| self.sink.record(event))).is_err() {
      warn!("Telemetry sink panicked while recording {name}");
    }
  }
}
