//! # Request Composition
//!
//! [`RequestSpec`] is what a resource wrapper hands to the engine: an
//! immutable description of one logical call. [`RequestBuilder`] turns it,
//! together with the resolved [`Credential`], into the [`PhysicalRequest`]
//! the executor puts on the wire. Building is a pure transform.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use octorest_core::EngineConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Credential;
use crate::consts::{API_BASE_URL, JSON_CONTENT_TYPE, USER_AGENT as USER_AGENT_VALUE};
use crate::error::HttpFailure;

/// HTTP methods the engine issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
  #[default]
  Get,
  Post,
  Patch,
  Delete,
  Put,
}

impl Method {
  pub const fn as_str(self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
      Method::Put => "PUT",
    }
  }

  pub(crate) fn to_reqwest(self) -> reqwest::Method {
    match self {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
      Method::Put => reqwest::Method::PUT,
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Method {
  type Err = HttpFailure;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "GET" => Ok(Method::Get),
      "POST" => Ok(Method::Post),
      "PATCH" => Ok(Method::Patch),
      "DELETE" => Ok(Method::Delete),
      "PUT" => Ok(Method::Put),
      other => Err(HttpFailure::InvalidRequest(format!("unsupported HTTP method '{other}'"))),
    }
  }
}

/// Telemetry metadata a wrapper attaches to a call. Property values must
/// already be scrubbed of user-identifying data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryProperties {
  pub event_name: Option<String>,
  pub properties: BTreeMap<String, String>,
}

/// Immutable description of one logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
  host: Option<String>,
  uri_fragment: String,
  method: Method,
  body: Option<Value>,
  accept: Option<String>,
  extra_headers: BTreeMap<String, String>,
  credential: Option<Credential>,
  description: String,
  expect_multiple_pages: bool,
  extended_result: bool,
  no_status: Option<bool>,
  telemetry: TelemetryProperties,
}

impl RequestSpec {
  /// Start describing a call to `uri_fragment` (path plus query, already
  /// escaped; an absolute `http(s)://` URL is used verbatim).
  pub fn builder(method: Method, uri_fragment: impl Into<String>) -> RequestSpecBuilder {
    let uri_fragment = uri_fragment.into();
    RequestSpecBuilder {
      spec: RequestSpec {
        host: None,
        description: format!("{method} {uri_fragment}"),
        uri_fragment,
        method,
        body: None,
        accept: None,
        extra_headers: BTreeMap::new(),
        credential: None,
        expect_multiple_pages: false,
        extended_result: false,
        no_status: None,
        telemetry: TelemetryProperties::default(),
      },
    }
  }

  pub fn get(uri_fragment: impl Into<String>) -> RequestSpecBuilder {
    Self::builder(Method::Get, uri_fragment)
  }

  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  pub fn uri_fragment(&self) -> &str {
    &self.uri_fragment
  }

  pub const fn method(&self) -> Method {
    self.method
  }

  pub const fn body(&self) -> Option<&Value> {
    self.body.as_ref()
  }

  pub fn accept(&self) -> Option<&str> {
    self.accept.as_deref()
  }

  pub const fn extra_headers(&self) -> &BTreeMap<String, String> {
    &self.extra_headers
  }

  /// Explicit credential override supplied by the caller
  pub const fn credential(&self) -> Option<&Credential> {
    self.credential.as_ref()
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub const fn expect_multiple_pages(&self) -> bool {
    self.expect_multiple_pages
  }

  pub const fn extended_result(&self) -> bool {
    self.extended_result
  }

  /// `None` defers to the configured default
  pub const fn no_status(&self) -> Option<bool> {
    self.no_status
  }

  pub const fn telemetry(&self) -> &TelemetryProperties {
    &self.telemetry
  }
}

/// Builder for [`RequestSpec`].
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
  spec: RequestSpec,
}

impl RequestSpecBuilder {
  /// Target a different host than the configured one
  pub fn host(mut self, host: impl Into<String>) -> Self {
    self.spec.host = Some(host.into());
    self
  }

  pub fn body(mut self, body: Value) -> Self {
    self.spec.body = Some(body);
    self
  }

  pub fn accept(mut self, accept: impl Into<String>) -> Self {
    self.spec.accept = Some(accept.into());
    self
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.spec.extra_headers.insert(name.into(), value.into());
    self
  }

  /// Explicit token for this call; blank tokens are ignored
  pub fn access_token(mut self, token: &str) -> Self {
    self.spec.credential = Credential::token(token);
    self
  }

  pub fn credential(mut self, credential: Credential) -> Self {
    self.spec.credential = Some(credential);
    self
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.spec.description = description.into();
    self
  }

  pub const fn multiple_pages(mut self, expect: bool) -> Self {
    self.spec.expect_multiple_pages = expect;
    self
  }

  pub const fn extended_result(mut self, extended: bool) -> Self {
    self.spec.extended_result = extended;
    self
  }

  pub const fn no_status(mut self, no_status: bool) -> Self {
    self.spec.no_status = Some(no_status);
    self
  }

  pub fn event_name(mut self, name: impl Into<String>) -> Self {
    self.spec.telemetry.event_name = Some(name.into());
    self
  }

  pub fn telemetry_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.spec.telemetry.properties.insert(key.into(), value.into());
    self
  }

  pub fn build(self) -> RequestSpec {
    self.spec
  }
}

/// A fully-resolved request ready for the executor.
#[derive(Debug, Clone)]
pub struct PhysicalRequest {
  pub method: Method,
  pub url: Url,
  /// Everything except `Authorization`, which is applied from `credential`
  /// when the request is sent.
  pub headers: HeaderMap,
  pub body: Option<String>,
  pub credential: Credential,
  pub description: String,
}

impl PhysicalRequest {
  /// Same request against another URL, used to follow page cursors
  pub fn with_url(&self, url: Url) -> Self {
    Self {
      url,
      ..self.clone()
    }
  }

  pub(crate) fn to_reqwest(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
    let mut builder = client
      .request(self.method.to_reqwest(), self.url.clone())
      .headers(self.headers.clone());

    builder = match &self.credential {
      Credential::Token(token) => builder.header(AUTHORIZATION, format!("token {token}")),
      Credential::Basic { username, password } => builder.basic_auth(username, Some(password)),
      Credential::Anonymous => builder,
    };

    match &self.body {
      Some(body) => builder.body(body.clone()),
      None => builder,
    }
  }
}

/// Composes physical requests from specs.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
  default_host: String,
  default_accept: String,
}

impl RequestBuilder {
  pub fn new(default_host: impl Into<String>, default_accept: impl Into<String>) -> Self {
    Self {
      default_host: default_host.into(),
      default_accept: default_accept.into(),
    }
  }

  pub fn from_config(config: &EngineConfig) -> Self {
    Self::new(&config.api_host_name, &config.default_accept)
  }

  pub fn build(&self, spec: &RequestSpec, credential: Credential) -> Result<PhysicalRequest, HttpFailure> {
    let base = api_base_url(spec.host().unwrap_or(&self.default_host));
    let url = join_url(&base, spec.uri_fragment())?;

    let mut headers = HeaderMap::new();
    let accept = spec.accept().filter(|a| !a.trim().is_empty()).unwrap_or(&self.default_accept);
    headers.insert(ACCEPT, header_value(accept)?);
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    let body = match (spec.body(), spec.method()) {
      (Some(_), Method::Get) => {
        debug!("Ignoring request body for GET {}", url);
        None
      }
      (Some(body), _) => {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Some(body.to_string())
      }
      (None, _) => None,
    };

    for (name, value) in spec.extra_headers() {
      let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| HttpFailure::InvalidRequest(format!("invalid header name '{name}': {e}")))?;
      if name == AUTHORIZATION {
        warn!("Ignoring Authorization in extra headers; use an explicit credential instead");
        continue;
      }
      headers.insert(name, header_value(value)?);
    }

    Ok(PhysicalRequest {
      method: spec.method(),
      url,
      headers,
      body,
      credential,
      description: spec.description().to_string(),
    })
  }
}

/// API base URL for a configured host.
///
/// `github.com` maps to the public API, explicit `http(s)://` bases are kept,
/// and any other host name is treated as GitHub Enterprise Server.
pub fn api_base_url(host: &str) -> String {
  let host = host.trim().trim_end_matches('/');
  if host.starts_with("http://") || host.starts_with("https://") {
    host.to_string()
  } else if host.is_empty() || host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("api.github.com") {
    API_BASE_URL.to_string()
  } else {
    format!("https://{host}/api/v3")
  }
}

/// Join a base URL and an escaped fragment with exactly one `/`.
pub fn join_url(base: &str, fragment: &str) -> Result<Url, HttpFailure> {
  let fragment = fragment.trim();
  let full = if fragment.starts_with("http://") || fragment.starts_with("https://") {
    fragment.to_string()
  } else {
    format!("{}/{}", base.trim_end_matches('/'), fragment.trim_start_matches('/'))
  };

  Url::parse(&full).map_err(|e| HttpFailure::InvalidRequest(format!("invalid URL '{full}': {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue, HttpFailure> {
  HeaderValue::from_str(value).map_err(|e| HttpFailure::InvalidRequest(format!("invalid header value '{value}': {e}")))
}
