//! # GitHub REST Invocation Engine
//!
//! A single shared engine for GitHub REST calls. Resource wrappers describe a
//! call with a [`RequestSpec`]; the engine resolves credentials, retries
//! transient failures, follows pagination, optionally runs the call in the
//! background and records one telemetry event per call.

pub mod auth;
pub mod background;
pub mod client;
pub mod consts;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod models;
pub mod pagination;
pub mod request;
pub mod response;
pub mod retry;
pub mod telemetry;
pub mod utils;

// Re-export the client
pub use auth::{Authenticator, Credential, CredentialSource};
pub use background::{BackgroundRunner, ProgressReporter, RunStrategy, TracingProgress};
pub use client::{GitHubClient, create_github_client};
pub use context::{CallContext, CancellationToken};
pub use error::{FieldError, HttpFailure};
// Re-export models
pub use models::{GitHubUser, RepositoryCoordinates};
pub use pagination::{PageCursor, Paginator};
pub use request::{Method, RequestSpec, TelemetryProperties};
pub use response::{CallStats, InvokeOutput, RateLimitInfo, ResponseEnvelope, ResponseMeta};
pub use retry::RetryPolicy;
pub use telemetry::{MemoryTelemetry, NoopTelemetry, Outcome, TelemetryEvent, TelemetrySink, TracingTelemetry};
pub use utils::parse_repository;
