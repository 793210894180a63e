//! # Retry Policy
//!
//! Wraps the [`Executor`] with exponential backoff for transient failures
//! (rate limits, 5xx, transport errors) and with polling for `202 Accepted`
//! results that GitHub is still computing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use octorest_core::RetrySettings;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::consts::{HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET, MAX_SERVER_RETRY_HINT};
use crate::context::CallContext;
use crate::error::HttpFailure;
use crate::executor::Executor;
use crate::request::{Method, PhysicalRequest};
use crate::response::{CallStats, ResponseEnvelope, ResponseHeaders};

/// Per-call retry bookkeeping. Never shared between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
  pub attempt_count: u32,
  pub last_status: Option<u16>,
  pub next_delay: Option<Duration>,
  pub deadline: Option<Instant>,
}

impl RetryState {
  pub const fn new(deadline: Option<Instant>) -> Self {
    Self {
      attempt_count: 0,
      last_status: None,
      next_delay: None,
      deadline,
    }
  }
}

/// Backoff and polling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  base_delay: Duration,
  max_delay: Duration,
  not_ready_retries: u32,
  not_ready_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::from_settings(&RetrySettings::default())
  }
}

impl RetryPolicy {
  /// Create a new policy; `max_attempts` counts the first try and is at
  /// least one
  pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
    Self {
      max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
      base_delay,
      max_delay,
      not_ready_retries: 0,
      not_ready_delay: Duration::ZERO,
    }
  }

  pub const fn from_settings(settings: &RetrySettings) -> Self {
    Self::new(settings.max_attempts, settings.base_delay(), settings.max_delay())
      .with_not_ready(settings.not_ready_retries, settings.not_ready_delay())
  }

  /// Poll `202 Accepted` results `retries` more times, `delay` apart
  pub const fn with_not_ready(mut self, retries: u32, delay: Duration) -> Self {
    self.not_ready_retries = retries;
    self.not_ready_delay = delay;
    self
  }

  pub const fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Exponential backoff after the `attempt`-th failure (1-based), capped
  /// at the maximum delay.
  pub fn backoff_delay(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    self.base_delay.saturating_mul(1 << exponent).min(self.max_delay)
  }

  /// Wait before retrying: the larger of backoff and the server's hint.
  pub fn delay_for(&self, attempt: u32, failure: &HttpFailure) -> Duration {
    let backoff = self.backoff_delay(attempt);
    failure.retry_after().map_or(backoff, |hint| hint.max(backoff))
  }

  /// Run `request` to a final outcome. Returns the envelope together with
  /// the physical request and retry counts.
  pub async fn execute(
    &self,
    executor: &Executor,
    request: &PhysicalRequest,
    ctx: &CallContext,
  ) -> Result<(ResponseEnvelope, CallStats), HttpFailure> {
    let mut stats = CallStats::default();
    let mut not_ready_polls = 0;

    loop {
      let envelope = self.execute_transient(executor, request, ctx, &mut stats).await?;

      if envelope.status != 202 || request.method != Method::Get {
        return Ok((envelope, stats));
      }

      if not_ready_polls >= self.not_ready_retries {
        warn!("{} was still not ready after {} polls", request.url, not_ready_polls);
        return Err(HttpFailure::ResultNotReady {
          attempts: not_ready_polls + 1,
        });
      }

      not_ready_polls += 1;
      info!(
        "GitHub is still computing {}; polling again in {:?} ({}/{})",
        request.url, self.not_ready_delay, not_ready_polls, self.not_ready_retries
      );
      ctx.sleep(self.not_ready_delay).await?;
      stats.retries += 1;
    }
  }

  async fn execute_transient(
    &self,
    executor: &Executor,
    request: &PhysicalRequest,
    ctx: &CallContext,
    stats: &mut CallStats,
  ) -> Result<ResponseEnvelope, HttpFailure> {
    let mut state = RetryState::new(ctx.deadline());

    loop {
      state.attempt_count += 1;
      stats.physical_requests += 1;

      let failure = match ctx.guard(executor.send(request)).await {
        Ok(envelope) => return Ok(envelope),
        Err(failure) => failure,
      };
      state.last_status = failure.status();

      if !failure.is_retryable() {
        return Err(failure);
      }

      if state.attempt_count >= self.max_attempts {
        warn!(
          "Giving up on {} after {} attempts: {}",
          request.url, state.attempt_count, failure
        );
        return Err(failure);
      }

      let delay = self.delay_for(state.attempt_count, &failure);
      if ctx.would_exceed_deadline(delay) {
        warn!("Not retrying {}: waiting {:?} would pass the call deadline", request.url, delay);
        return Err(failure);
      }
      state.next_delay = Some(delay);

      info!(
        "Retrying {} in {:?} (attempt {}/{}): {}",
        request.url,
        delay,
        state.attempt_count + 1,
        self.max_attempts,
        failure
      );
      debug!("Retry state: {:?}", state);

      ctx.sleep(delay).await?;
      stats.retries += 1;
    }
  }
}

/// Server-provided wait hint: `Retry-After` as delta-seconds or HTTP-date,
/// else `x-ratelimit-reset` when the remaining budget is zero. Capped at
/// [`MAX_SERVER_RETRY_HINT`].
pub(crate) fn server_retry_hint(headers: &ResponseHeaders, now: DateTime<Utc>) -> Option<Duration> {
  if let Some(value) = headers.get("retry-after").map(str::trim) {
    if let Ok(secs) = value.parse::<u64>() {
      return Some(Duration::from_secs(secs).min(MAX_SERVER_RETRY_HINT));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
      return Some(until(date.with_timezone(&Utc), now));
    }
    debug!("Ignoring unparseable Retry-After header: {value}");
  }

  if headers.get(HEADER_RATE_LIMIT_REMAINING).map(str::trim) == Some("0") {
    return headers
      .get(HEADER_RATE_LIMIT_RESET)
      .and_then(|v| v.trim().parse::<i64>().ok())
      .and_then(|secs| DateTime::from_timestamp(secs, 0))
      .map(|reset| until(reset, now));
  }

  None
}

fn until(when: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
  (when - now).to_std().unwrap_or(Duration::ZERO).min(MAX_SERVER_RETRY_HINT)
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

  use super::*;
  use crate::auth::Credential;
  use crate::context::CancellationToken;
  use crate::request::{RequestBuilder, RequestSpec};

  fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(10), Duration::from_millis(50))
  }

  fn executor() -> Executor {
    Executor::new(Duration::from_secs(5), false).unwrap()
  }

  fn get(server: &MockServer, fragment: &str) -> PhysicalRequest {
    RequestBuilder::new(server.uri(), "application/vnd.github.v3+json")
      .build(&RequestSpec::get(fragment).build(), Credential::Anonymous)
      .unwrap()
  }

  fn no_deadline() -> CallContext {
    CallContext::new(CancellationToken::new(), Duration::ZERO)
  }

  fn headers(pairs: &[(&str, &str)]) -> ResponseHeaders {
    let mut headers = ResponseHeaders::default();
    for (name, value) in pairs {
      headers.insert(name, value);
    }
    headers
  }

  /// Answers with each status in turn, repeating the last one
  struct Sequence {
    statuses: Vec<u16>,
    calls: AtomicU32,
  }

  impl Respond for Sequence {
    fn respond(&self, _: &Request) -> ResponseTemplate {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
      let status = self.statuses[n.min(self.statuses.len() - 1)];
      ResponseTemplate::new(status).set_body_json(json!({"call": n + 1}))
    }
  }

  #[test]
  fn test_backoff_doubles_and_caps() {
    let policy = RetryPolicy::new(10, Duration::from_millis(500), Duration::from_secs(3));

    assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
    assert_eq!(policy.backoff_delay(2), Duration::from_secs(1));
    assert_eq!(policy.backoff_delay(3), Duration::from_secs(2));
    assert_eq!(policy.backoff_delay(4), Duration::from_secs(3));
    assert_eq!(policy.backoff_delay(40), Duration::from_secs(3));
  }

  #[test]
  fn test_delay_prefers_longer_server_hint() {
    let policy = RetryPolicy::new(4, Duration::from_millis(500), Duration::from_secs(60));
    let hinted = HttpFailure::RateLimited {
      status: 429,
      retry_after: Some(Duration::from_secs(2)),
      message: String::new(),
    };
    let unhinted = HttpFailure::RateLimited {
      status: 429,
      retry_after: None,
      message: String::new(),
    };

    assert_eq!(policy.delay_for(1, &hinted), Duration::from_secs(2));
    assert_eq!(policy.delay_for(1, &unhinted), Duration::from_millis(500));
    assert_eq!(policy.delay_for(4, &hinted), Duration::from_secs(4));
  }

  #[test]
  fn test_zero_attempts_means_one() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
  }

  #[test]
  fn test_server_retry_hint() {
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let h = headers(&[("Retry-After", "2")]);
    assert_eq!(server_retry_hint(&h, now), Some(Duration::from_secs(2)));

    // 2023-11-14T22:13:30Z is ten seconds after `now`
    let h = headers(&[("Retry-After", "Tue, 14 Nov 2023 22:13:30 GMT")]);
    assert_eq!(server_retry_hint(&h, now), Some(Duration::from_secs(10)));

    let h = headers(&[("Retry-After", "18446744073709551615")]);
    assert_eq!(server_retry_hint(&h, now), Some(MAX_SERVER_RETRY_HINT));

    let h = headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1700000030")]);
    assert_eq!(server_retry_hint(&h, now), Some(Duration::from_secs(30)));

    let h = headers(&[("x-ratelimit-remaining", "12"), ("x-ratelimit-reset", "1700000030")]);
    assert_eq!(server_retry_hint(&h, now), None);

    // A reset in the past means no wait
    let h = headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1600000000")]);
    assert_eq!(server_retry_hint(&h, now), Some(Duration::ZERO));
  }

  #[tokio::test]
  async fn test_retries_up_to_max_attempts() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/flaky"))
      .respond_with(ResponseTemplate::new(503))
      .expect(3)
      .mount(&mock_server)
      .await;

    let result = fast_policy(3)
      .execute(&executor(), &get(&mock_server, "flaky"), &no_deadline())
      .await;

    assert!(matches!(result, Err(HttpFailure::ServerError { status: 503, .. })));
    Ok(())
  }

  #[tokio::test]
  async fn test_recovers_after_transient_failure() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/flaky"))
      .respond_with(Sequence {
        statuses: vec![502, 429, 200],
        calls: AtomicU32::new(0),
      })
      .expect(3)
      .mount(&mock_server)
      .await;

    let (envelope, stats) = fast_policy(4)
      .execute(&executor(), &get(&mock_server, "flaky"), &no_deadline())
      .await?;

    assert_eq!(envelope.body["call"], 3);
    assert_eq!(stats.physical_requests, 3);
    assert_eq!(stats.retries, 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_non_retryable_statuses_are_sent_once() -> anyhow::Result<()> {
    for status in [401, 403, 404, 422] {
      let mock_server = MockServer::start().await;

      Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&mock_server)
        .await;

      let result = fast_policy(5)
        .execute(&executor(), &get(&mock_server, "thing"), &no_deadline())
        .await;

      let failure = result.unwrap_err();
      assert!(!failure.is_retryable(), "status {status}");
      assert_eq!(failure.status(), Some(status));
    }
    Ok(())
  }

  #[tokio::test]
  async fn test_honors_retry_after_seconds() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/limited"))
      .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
      .up_to_n_times(1)
      .with_priority(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/limited"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .mount(&mock_server)
      .await;

    let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(60));
    let started = std::time::Instant::now();
    let (envelope, _) = policy
      .execute(&executor(), &get(&mock_server, "limited"), &no_deadline())
      .await?;

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(envelope.body["ok"], true);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_cancel_during_backoff() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&mock_server)
      .await;

    let policy = RetryPolicy::new(5, Duration::from_secs(30), Duration::from_secs(60));
    let ctx = no_deadline();
    let token = ctx.cancel_token().clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(200)).await;
      token.cancel();
    });

    let started = std::time::Instant::now();
    let result = policy.execute(&executor(), &get(&mock_server, "down"), &ctx).await;

    assert!(matches!(result, Err(HttpFailure::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    Ok(())
  }

  #[tokio::test]
  async fn test_wait_past_deadline_surfaces_last_failure() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(500))
      .expect(1)
      .mount(&mock_server)
      .await;

    let policy = RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(60));
    let ctx = CallContext::new(CancellationToken::new(), Duration::from_secs(1));
    let result = policy.execute(&executor(), &get(&mock_server, "down"), &ctx).await;

    assert!(matches!(result, Err(HttpFailure::ServerError { status: 500, .. })));
    Ok(())
  }

  #[tokio::test]
  async fn test_enormous_retry_after_surfaces_rate_limit() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "18446744073709551615"))
      .expect(1)
      .mount(&mock_server)
      .await;

    let ctx = CallContext::new(CancellationToken::new(), Duration::from_secs(600));
    let result = fast_policy(3).execute(&executor(), &get(&mock_server, "user"), &ctx).await;

    match result {
      Err(HttpFailure::RateLimited { status, retry_after, .. }) => {
        assert_eq!(status, 429);
        assert_eq!(retry_after, Some(MAX_SERVER_RETRY_HINT));
      }
      other => panic!("expected RateLimited, got {other:?}"),
    }
    Ok(())
  }

  #[tokio::test]
  async fn test_polls_accepted_until_ready() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/repos/o/r/stats/contributors"))
      .respond_with(Sequence {
        statuses: vec![202, 202, 200],
        calls: AtomicU32::new(0),
      })
      .expect(3)
      .mount(&mock_server)
      .await;

    let policy = fast_policy(2).with_not_ready(5, Duration::from_millis(10));
    let (envelope, stats) = policy
      .execute(&executor(), &get(&mock_server, "repos/o/r/stats/contributors"), &no_deadline())
      .await?;

    assert_eq!(envelope.status, 200);
    assert_eq!(stats.physical_requests, 3);
    Ok(())
  }

  #[tokio::test]
  async fn test_result_not_ready_after_polls() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(202))
      .expect(3)
      .mount(&mock_server)
      .await;

    let policy = fast_policy(2).with_not_ready(2, Duration::from_millis(10));
    let result = policy
      .execute(&executor(), &get(&mock_server, "repos/o/r/stats/punch_card"), &no_deadline())
      .await;

    assert!(matches!(result, Err(HttpFailure::ResultNotReady { attempts: 3 })));
    Ok(())
  }
}
