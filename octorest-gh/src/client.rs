//! # GitHub Client
//!
//! [`GitHubClient`] ties the engine together. Every logical call goes through
//! [`GitHubClient::invoke`]: resolve the credential, build the request, run
//! it (inline or in the background) with retry and optional pagination under
//! the call deadline, then record exactly one telemetry event.

use std::sync::Arc;

use anyhow::{Context, Result};
use octorest_core::EngineConfig;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::auth::Authenticator;
use crate::background::{BackgroundRunner, ProgressReporter, TracingProgress};
use crate::context::{CallContext, CancellationToken};
use crate::error::HttpFailure;
use crate::executor::Executor;
use crate::pagination::Paginator;
use crate::request::{PhysicalRequest, RequestBuilder, RequestSpec};
use crate::response::{InvokeOutput, ResponseMeta};
use crate::retry::RetryPolicy;
use crate::telemetry::{Outcome, TelemetryEmitter, TelemetryEvent, TelemetrySink};

/// Shared, immutable entry point for GitHub REST calls.
#[derive(Debug, Clone)]
pub struct GitHubClient {
  config: Arc<EngineConfig>,
  authenticator: Arc<Authenticator>,
  builder: RequestBuilder,
  executor: Executor,
  retry: RetryPolicy,
  runner: BackgroundRunner,
  telemetry: TelemetryEmitter,
}

impl GitHubClient {
  /// Create a new client from engine configuration and a credential source
  pub fn new(config: EngineConfig, authenticator: Authenticator) -> Result<Self> {
    let executor = Executor::new(config.web_request_timeout(), config.log_request_body)?;

    Ok(Self {
      builder: RequestBuilder::from_config(&config),
      retry: RetryPolicy::from_settings(&config.retry),
      runner: BackgroundRunner::new(Arc::new(TracingProgress), config.progress_interval()),
      telemetry: TelemetryEmitter::for_config(config.disable_telemetry),
      executor,
      config: Arc::new(config),
      authenticator: Arc::new(authenticator),
    })
  }

  /// Create a client whose default credential comes from `GITHUB_TOKEN` or
  /// `~/.netrc`
  pub fn from_environment(config: EngineConfig) -> Result<Self> {
    let authenticator = Authenticator::from_environment(&config).context("Failed to discover GitHub credentials")?;
    Self::new(config, authenticator)
  }

  pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
    self.telemetry = TelemetryEmitter::new(sink);
    self
  }

  pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
    self.runner = self.runner.with_reporter(reporter);
    self
  }

  pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn authenticator(&self) -> &Authenticator {
    &self.authenticator
  }

  /// Perform one logical call.
  #[instrument(skip_all, fields(call = %spec.description()), level = "debug")]
  pub async fn invoke(&self, spec: RequestSpec, cancel: &CancellationToken) -> Result<InvokeOutput, HttpFailure> {
    let pending = PendingEvent {
      client: self,
      spec: &spec,
      started: Instant::now(),
      recorded: false,
    };
    let no_status = spec.no_status().unwrap_or(self.config.default_no_status);

    let result = match self.prepare(&spec) {
      Ok(request) => {
        let client = self.clone();
        let ctx = CallContext::new(cancel.clone(), self.config.call_timeout());
        let paginate = spec.expect_multiple_pages();
        let extended = spec.extended_result();

        self
          .runner
          .run(no_status, spec.description(), cancel, async move {
            ctx
              .within_deadline(client.execute_call(request, paginate, extended, &ctx))
              .await
          })
          .await
      }
      Err(failure) => Err(failure),
    };

    pending.finish(&result);
    result
  }

  /// Check that the configured credential is accepted by GitHub
  pub async fn test_connection(&self) -> Result<bool> {
    let spec = RequestSpec::get("user")
      .description("Checking GitHub connection")
      .event_name("connection.test")
      .no_status(true)
      .build();

    match self.invoke(spec, &CancellationToken::new()).await {
      Ok(_) => Ok(true),
      Err(HttpFailure::AuthFailure { .. }) => Ok(false),
      Err(e) => Err(e).context("Failed to connect to GitHub"),
    }
  }

  fn prepare(&self, spec: &RequestSpec) -> Result<PhysicalRequest, HttpFailure> {
    let credential = self.authenticator.resolve(spec.credential());
    debug!("Resolved credential {:?} for {}", credential, spec.description());
    self.builder.build(spec, credential)
  }

  async fn execute_call(
    &self,
    request: PhysicalRequest,
    paginate: bool,
    extended: bool,
    ctx: &CallContext,
  ) -> Result<InvokeOutput, HttpFailure> {
    if paginate {
      let pages = Paginator::new(&self.retry, &self.executor, ctx, request)
        .collect_all()
        .await?;
      let meta = if extended {
        pages.last.as_ref().map(ResponseMeta::from_envelope)
      } else {
        None
      };
      return Ok(InvokeOutput {
        body: Value::Array(pages.items),
        meta,
        stats: pages.stats,
      });
    }

    let (envelope, mut stats) = self.retry.execute(&self.executor, &request, ctx).await?;
    stats.pages = 1;
    let meta = extended.then(|| ResponseMeta::from_envelope(&envelope));
    Ok(InvokeOutput {
      body: envelope.body,
      meta,
      stats,
    })
  }

  fn record(&self, spec: &RequestSpec, result: &Result<InvokeOutput, HttpFailure>, started: Instant) {
    let telemetry = spec.telemetry();
    let event_name = telemetry
      .event_name
      .clone()
      .unwrap_or_else(|| format!("rest.{}", spec.method().as_str().to_ascii_lowercase()));

    let outcome = match result {
      Ok(_) => Outcome::Success,
      Err(failure) => Outcome::Failure {
        kind: failure.kind().to_string(),
        status: failure.status(),
      },
    };

    let mut event = TelemetryEvent::new(event_name, telemetry.properties.clone(), outcome, started.elapsed());
    if let Ok(output) = result {
      event = event.with_stats(output.stats);
    }
    self.telemetry.record(event);
  }
}

/// Records the call's telemetry event exactly once, including when the
/// caller drops `invoke` before it completes.
struct PendingEvent<'a> {
  client: &'a GitHubClient,
  spec: &'a RequestSpec,
  started: Instant,
  recorded: bool,
}

impl PendingEvent<'_> {
  fn finish(mut self, result: &Result<InvokeOutput, HttpFailure>) {
    self.recorded = true;
    self.client.record(self.spec, result, self.started);
  }
}

impl Drop for PendingEvent<'_> {
  fn drop(&mut self) {
    if !self.recorded {
      debug!("{} was dropped before completing", self.spec.description());
      self.client.record(self.spec, &Err(HttpFailure::Cancelled), self.started);
    }
  }
}

/// Create a GitHub client from configuration, discovering the default
/// credential from the environment
pub fn create_github_client(config: EngineConfig) -> Result<GitHubClient> {
  GitHubClient::from_environment(config.with_env_overrides())
}
