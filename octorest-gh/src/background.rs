//! # Background Execution
//!
//! Long calls (many pages, slow statistics endpoints, long backoffs) can run
//! on a spawned task while the caller reports elapsed time. Both strategies
//! return exactly what the work returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::context::CancellationToken;
use crate::error::HttpFailure;

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);
const MAX_PROGRESS_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Aborts the spawned call when the caller stops waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
  fn drop(&mut self) {
    self.0.abort();
  }
}

/// Receives progress for calls run in the background.
pub trait ProgressReporter: Send + Sync {
  fn started(&self, _description: &str) {}

  /// Called at a fixed interval while the call is in flight
  fn progress(&self, description: &str, elapsed: Duration);

  fn finished(&self, _description: &str, _elapsed: Duration, _success: bool) {}
}

/// Reports progress as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
  fn progress(&self, description: &str, elapsed: Duration) {
    debug!("{description}: {:.1}s elapsed", elapsed.as_secs_f64());
  }

  fn finished(&self, description: &str, elapsed: Duration, success: bool) {
    let outcome = if success { "completed" } else { "failed" };
    info!("{description} {outcome} after {:.1}s", elapsed.as_secs_f64());
  }
}

/// How a call is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStrategy {
  /// Awaited on the calling task with no progress reporting
  Inline,
  /// Spawned on its own task with periodic progress
  Background,
}

/// Runs call work inline or on a background task.
#[derive(Clone)]
pub struct BackgroundRunner {
  reporter: Arc<dyn ProgressReporter>,
  interval: Duration,
}

impl std::fmt::Debug for BackgroundRunner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BackgroundRunner")
      .field("interval", &self.interval)
      .finish_non_exhaustive()
  }
}

impl Default for BackgroundRunner {
  fn default() -> Self {
    Self::new(Arc::new(TracingProgress), DEFAULT_PROGRESS_INTERVAL)
  }
}

impl BackgroundRunner {
  /// Create a new runner reporting to `reporter` every `interval`
  pub fn new(reporter: Arc<dyn ProgressReporter>, interval: Duration) -> Self {
    let interval = if interval.is_zero() {
      DEFAULT_PROGRESS_INTERVAL
    } else {
      interval.min(MAX_PROGRESS_INTERVAL)
    };
    Self { reporter, interval }
  }

  pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
    self.reporter = reporter;
    self
  }

  pub const fn interval(&self) -> Duration {
    self.interval
  }

  pub const fn strategy(no_status: bool) -> RunStrategy {
    if no_status {
      RunStrategy::Inline
    } else {
      RunStrategy::Background
    }
  }

  /// Drive `work` to completion, inline when `no_status` is set.
  ///
  /// Cancelling `cancel` aborts a background task, dropping any in-flight
  /// request, and yields `Cancelled`. Dropping the returned future aborts
  /// the task as well.
  pub async fn run<T, F>(
    &self,
    no_status: bool,
    description: &str,
    cancel: &CancellationToken,
    work: F,
  ) -> Result<T, HttpFailure>
  where
    T: Send + 'static,
    F: Future<Output = Result<T, HttpFailure>> + Send + 'static,
  {
    match Self::strategy(no_status) {
      RunStrategy::Inline => cancel.run_until_cancelled(work).await.unwrap_or(Err(HttpFailure::Cancelled)),
      RunStrategy::Background => self.run_background(description, cancel, work).await,
    }
  }

  async fn run_background<T, F>(&self, description: &str, cancel: &CancellationToken, work: F) -> Result<T, HttpFailure>
  where
    T: Send + 'static,
    F: Future<Output = Result<T, HttpFailure>> + Send + 'static,
  {
    let started = Instant::now();
    self.reporter.started(description);

    let mut handle = AbortOnDrop(tokio::spawn(work));
    let first_tick = started.checked_add(self.interval).unwrap_or(started);
    let mut ticker = tokio::time::interval_at(first_tick, self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
      tokio::select! {
        biased;
        () = cancel.cancelled() => {
          debug!("Aborting background task for {description}");
          handle.0.abort();
          break Err(HttpFailure::Cancelled);
        }
        joined = &mut handle.0 => {
          break match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(HttpFailure::Cancelled),
            Err(e) => Err(HttpFailure::BackgroundTask(e.to_string())),
          };
        }
        _ = ticker.tick() => self.reporter.progress(description, started.elapsed()),
      }
    };

    self.reporter.finished(description, started.elapsed(), result.is_ok());
    result
  }
}
