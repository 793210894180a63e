//! # Call Context
//!
//! Cancellation and the wall-clock deadline shared by every suspension point
//! of one logical call: network waits, backoff sleeps and page fetches.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::HttpFailure;

/// Cloneable handle used to cancel in-flight calls.
///
/// All clones observe the same state; cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancellationToken {
  sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
  fn default() -> Self {
    Self::new()
  }
}

impl CancellationToken {
  pub fn new() -> Self {
    let (sender, _) = watch::channel(false);
    Self {
      sender: Arc::new(sender),
    }
  }

  /// Cancel every call observing this token
  pub fn cancel(&self) {
    self.sender.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.sender.borrow()
  }

  /// Resolves once the token is cancelled
  pub async fn cancelled(&self) {
    let mut receiver = self.sender.subscribe();
    // The sender lives as long as `self`, so this only returns on cancel.
    let _ = receiver.wait_for(|cancelled| *cancelled).await;
  }

  /// Drive `future` unless the token is cancelled first
  pub async fn run_until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
    tokio::select! {
      biased;
      () = self.cancelled() => None,
      output = future => Some(output),
    }
  }
}

/// Per-call cancellation and deadline.
#[derive(Debug, Clone)]
pub struct CallContext {
  cancel: CancellationToken,
  deadline: Option<Instant>,
  limit: Duration,
}

impl CallContext {
  /// A zero `limit` disables the deadline, as does one too far out to
  /// represent.
  pub fn new(cancel: CancellationToken, limit: Duration) -> Self {
    let deadline = if limit.is_zero() {
      None
    } else {
      Instant::now().checked_add(limit)
    };
    Self { cancel, deadline, limit }
  }

  pub fn cancel_token(&self) -> &CancellationToken {
    &self.cancel
  }

  pub const fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// Whether waiting `delay` from now would pass the deadline
  pub fn would_exceed_deadline(&self, delay: Duration) -> bool {
    self
      .deadline
      .is_some_and(|deadline| Instant::now().checked_add(delay).is_none_or(|end| end > deadline))
  }

  /// Await `future`, surfacing `Cancelled` if the token fires first
  pub async fn guard<T, F>(&self, future: F) -> Result<T, HttpFailure>
  where
    F: Future<Output = Result<T, HttpFailure>>,
  {
    self.cancel.run_until_cancelled(future).await.unwrap_or(Err(HttpFailure::Cancelled))
  }

  /// Cancellable sleep
  pub async fn sleep(&self, delay: Duration) -> Result<(), HttpFailure> {
    self
      .guard(async {
        tokio::time::sleep(delay).await;
        Ok(())
      })
      .await
  }

  /// Bound `future` by the call deadline
  pub async fn within_deadline<T, F>(&self, future: F) -> Result<T, HttpFailure>
  where
    F: Future<Output = Result<T, HttpFailure>>,
  {
    match self.deadline {
      Some(deadline) => tokio::time::timeout_at(deadline, future)
        .await
        .unwrap_or(Err(HttpFailure::DeadlineExceeded { limit: self.limit })),
      None => future.await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_clones_share_cancellation() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
    // Already-cancelled tokens resolve immediately.
    clone.cancelled().await;
  }

  #[tokio::test]
  async fn test_sleep_is_interrupted_by_cancel() {
    let ctx = CallContext::new(CancellationToken::new(), Duration::ZERO);
    let token = ctx.cancel_token().clone();

    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      token.cancel();
    });

    let started = std::time::Instant::now();
    let result = ctx.sleep(Duration::from_secs(30)).await;
    assert!(matches!(result, Err(HttpFailure::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
  }

  #[tokio::test]
  async fn test_within_deadline_times_out() {
    let ctx = CallContext::new(CancellationToken::new(), Duration::from_millis(20));

    let result: Result<(), HttpFailure> = ctx
      .within_deadline(async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
      })
      .await;

    assert!(matches!(result, Err(HttpFailure::DeadlineExceeded { .. })));
  }

  #[test]
  fn test_zero_limit_has_no_deadline() {
    let ctx = CallContext::new(CancellationToken::new(), Duration::ZERO);
    assert!(ctx.deadline().is_none());
    assert!(!ctx.would_exceed_deadline(Duration::from_secs(3600)));
  }

  #[tokio::test]
  async fn test_huge_durations_do_not_overflow() {
    let ctx = CallContext::new(CancellationToken::new(), Duration::from_secs(600));
    assert!(ctx.would_exceed_deadline(Duration::MAX));

    let unbounded = CallContext::new(CancellationToken::new(), Duration::MAX);
    assert!(unbounded.deadline().is_none());
    assert!(!unbounded.would_exceed_deadline(Duration::MAX));
  }

  #[tokio::test]
  async fn test_would_exceed_deadline() {
    let ctx = CallContext::new(CancellationToken::new(), Duration::from_secs(1));
    assert!(ctx.would_exceed_deadline(Duration::from_secs(5)));
    assert!(!ctx.would_exceed_deadline(Duration::from_millis(10)));
  }
}
