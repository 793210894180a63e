//! # Invocation Failures
//!
//! The typed failure taxonomy returned by every engine operation. Resource
//! wrappers match on these variants to decide whether a failure becomes an
//! error, a negative answer, or an empty collection.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// One field-level problem reported in a `422 Unprocessable Entity` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldError {
  pub resource: Option<String>,
  pub field: Option<String>,
  pub code: Option<String>,
  pub message: Option<String>,
}

impl FieldError {
  /// GitHub sends either objects or bare strings in `errors`.
  fn from_value(value: &Value) -> Self {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    match value {
      Value::String(message) => Self {
        message: Some(message.clone()),
        ..Self::default()
      },
      _ => Self {
        resource: text("resource"),
        field: text("field"),
        code: text("code"),
        message: text("message"),
      },
    }
  }
}

/// Failure of a logical call.
#[derive(Debug, Clone, Error)]
pub enum HttpFailure {
  /// 401, or a 403 that is not a rate-limit signal.
  #[error("authentication failed (HTTP {status}): {message}")]
  AuthFailure { status: u16, message: String },

  #[error("not found: {message}")]
  NotFound { message: String },

  #[error("validation failed: {message}{}", describe_field_errors(.errors))]
  ValidationFailure { message: String, errors: Vec<FieldError> },

  /// 429, or a 403 carrying a secondary rate-limit signal.
  #[error("rate limited (HTTP {status}): {message}")]
  RateLimited {
    status: u16,
    retry_after: Option<Duration>,
    message: String,
  },

  #[error("server error (HTTP {status}): {message}")]
  ServerError { status: u16, message: String },

  /// Any other non-success status.
  #[error("unexpected HTTP {status}: {message}")]
  UnexpectedStatus { status: u16, message: String },

  #[error("transport error: {message}")]
  TransportError { message: String, timed_out: bool },

  /// The server kept answering `202 Accepted` past the configured polls.
  #[error("result still not ready after {attempts} attempts")]
  ResultNotReady { attempts: u32 },

  #[error("call cancelled")]
  Cancelled,

  #[error("call exceeded its {}s deadline", .limit.as_secs())]
  DeadlineExceeded { limit: Duration },

  /// A page after the first failed; pages already fetched were discarded.
  #[error("pagination aborted at page {page}: {source}")]
  PaginationAborted { page: usize, source: Box<HttpFailure> },

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("background task failed: {0}")]
  BackgroundTask(String),
}

impl HttpFailure {
  /// Whether the retry policy may re-issue the request.
  pub const fn is_retryable(&self) -> bool {
    matches!(
      self,
      HttpFailure::RateLimited { .. } | HttpFailure::ServerError { .. } | HttpFailure::TransportError { .. }
    )
  }

  /// HTTP status behind the failure, when one was received.
  pub fn status(&self) -> Option<u16> {
    match self {
      HttpFailure::AuthFailure { status, .. }
      | HttpFailure::RateLimited { status, .. }
      | HttpFailure::ServerError { status, .. }
      | HttpFailure::UnexpectedStatus { status, .. } => Some(*status),
      HttpFailure::NotFound { .. } => Some(404),
      HttpFailure::ValidationFailure { .. } => Some(422),
      HttpFailure::PaginationAborted { source, .. } => source.status(),
      _ => None,
    }
  }

  /// Server-provided wait hint, if any.
  pub const fn retry_after(&self) -> Option<Duration> {
    match self {
      HttpFailure::RateLimited { retry_after, .. } => *retry_after,
      _ => None,
    }
  }

  /// Stable snake_case name used in telemetry and logs.
  pub const fn kind(&self) -> &'static str {
    match self {
      HttpFailure::AuthFailure { .. } => "auth_failure",
      HttpFailure::NotFound { .. } => "not_found",
      HttpFailure::ValidationFailure { .. } => "validation_failure",
      HttpFailure::RateLimited { .. } => "rate_limited",
      HttpFailure::ServerError { .. } => "server_error",
      HttpFailure::UnexpectedStatus { .. } => "unexpected_status",
      HttpFailure::TransportError { .. } => "transport_error",
      HttpFailure::ResultNotReady { .. } => "result_not_ready",
      HttpFailure::Cancelled => "cancelled",
      HttpFailure::DeadlineExceeded { .. } => "deadline_exceeded",
      HttpFailure::PaginationAborted { .. } => "pagination_aborted",
      HttpFailure::InvalidRequest(_) => "invalid_request",
      HttpFailure::BackgroundTask(_) => "background_task",
    }
  }

  pub(crate) fn transport(error: &reqwest::Error) -> Self {
    HttpFailure::TransportError {
      message: error.to_string(),
      timed_out: error.is_timeout(),
    }
  }
}

/// Error details parsed from a GitHub error body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ErrorDetails {
  pub message: String,
  pub errors: Vec<FieldError>,
}

impl ErrorDetails {
  /// Extract `message`, `documentation_url` and `errors` from a response
  /// body, falling back to the status reason phrase.
  pub(crate) fn from_body(status: u16, body: &Value) -> Self {
    let fallback = || {
      reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("no reason given")
        .to_string()
    };

    let mut message = match body {
      Value::Object(_) => body.get("message").and_then(Value::as_str).map(str::to_string),
      Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
      _ => None,
    }
    .unwrap_or_else(fallback);

    if let Some(docs) = body.get("documentation_url").and_then(Value::as_str) {
      let _ = write!(message, " ({docs})");
    }

    let errors = body
      .get("errors")
      .and_then(Value::as_array)
      .map(|items| items.iter().map(FieldError::from_value).collect())
      .unwrap_or_default();

    Self { message, errors }
  }
}

fn describe_field_errors(errors: &[FieldError]) -> String {
  let mut out = String::new();
  for error in errors {
    let subject = match (&error.resource, &error.field) {
      (Some(resource), Some(field)) => format!("{resource}.{field}"),
      (None, Some(field)) => field.clone(),
      (Some(resource), None) => resource.clone(),
      (None, None) => String::new(),
    };
    let detail = error.message.as_deref().or(error.code.as_deref()).unwrap_or("invalid");
    if subject.is_empty() {
      let _ = write!(out, "; {detail}");
    } else {
      let _ = write!(out, "; {subject}: {detail}");
    }
  }
  out
}
