//! # Pagination
//!
//! Follows `Link: <...>; rel="next"` headers to walk a multi-page
//! collection. Pages are fetched strictly in order, each one through the
//! retry policy, and a cursor is never followed twice.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::context::CallContext;
use crate::error::HttpFailure;
use crate::executor::Executor;
use crate::request::PhysicalRequest;
use crate::response::{CallStats, ResponseEnvelope, ResponseHeaders};
use crate::retry::RetryPolicy;

/// Opaque reference to the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(Url);

impl PageCursor {
  pub const fn url(&self) -> &Url {
    &self.0
  }

  pub fn into_url(self) -> Url {
    self.0
  }
}

impl fmt::Display for PageCursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0.as_str())
  }
}

/// The `rel="next"` target of the response's `Link` headers, if any.
pub fn next_page_cursor(headers: &ResponseHeaders) -> Option<PageCursor> {
  headers
    .get_all("link")
    .iter()
    .find_map(|value| next_link_target(value))
    .and_then(|target| match Url::parse(target) {
      Ok(url) => Some(PageCursor(url)),
      Err(e) => {
        warn!("Ignoring malformed next link '{target}': {e}");
        None
      }
    })
}

/// Find the target of `rel="next"` in one RFC 8288 `Link` value.
///
/// Targets are delimited by angle brackets rather than split on commas,
/// since query strings may contain commas.
fn next_link_target(value: &str) -> Option<&str> {
  let mut rest = value;
  while let Some(start) = rest.find('<') {
    let after = &rest[start + 1..];
    let end = after.find('>')?;
    let target = &after[..end];

    let tail = &after[end + 1..];
    let params_end = tail.find('<').unwrap_or(tail.len());
    if tail[..params_end].split(';').any(is_rel_next) {
      return Some(target.trim());
    }
    rest = &tail[params_end..];
  }
  None
}

fn is_rel_next(param: &str) -> bool {
  let param = param.trim().trim_end_matches(',').trim();
  match param.split_once('=') {
    Some((name, value)) if name.trim().eq_ignore_ascii_case("rel") => value
      .trim()
      .trim_matches('"')
      .split_whitespace()
      .any(|rel| rel.eq_ignore_ascii_case("next")),
    _ => false,
  }
}

/// Every item of a paginated collection, in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPages {
  pub items: Vec<Value>,
  /// Last page fetched, with its body moved into `items`
  pub last: Option<ResponseEnvelope>,
  pub stats: CallStats,
}

/// Lazy, finite walk over the pages of one collection.
pub struct Paginator<'a> {
  retry: &'a RetryPolicy,
  executor: &'a Executor,
  ctx: &'a CallContext,
  pending: Option<PhysicalRequest>,
  visited: HashSet<String>,
  page: usize,
  stats: CallStats,
}

impl<'a> Paginator<'a> {
  /// Create a new paginator starting at `first`
  pub fn new(retry: &'a RetryPolicy, executor: &'a Executor, ctx: &'a CallContext, first: PhysicalRequest) -> Self {
    let mut visited = HashSet::new();
    visited.insert(first.url.to_string());
    Self {
      retry,
      executor,
      ctx,
      pending: Some(first),
      visited,
      page: 0,
      stats: CallStats::default(),
    }
  }

  /// Pages fetched so far
  pub const fn pages(&self) -> usize {
    self.page
  }

  pub const fn stats(&self) -> CallStats {
    self.stats
  }

  /// Fetch the next page; `None` once the collection is exhausted or a
  /// page has failed.
  pub async fn next_page(&mut self) -> Option<Result<ResponseEnvelope, HttpFailure>> {
    let request = self.pending.take()?;
    self.page += 1;
    if self.page > 1 {
      debug!("Fetching page {} from {}", self.page, request.url);
    }

    let (mut envelope, stats) = match self.retry.execute(self.executor, &request, self.ctx).await {
      Ok(result) => result,
      Err(failure) => return Some(Err(self.wrap_failure(failure))),
    };
    self.stats.absorb(stats);
    self.stats.pages += 1;
    envelope.page = Some(self.page);

    if let Some(cursor) = next_page_cursor(&envelope.headers) {
      if cursor.url().origin() != request.url.origin() {
        warn!("Not following next link to another origin: {cursor}");
      } else if !self.visited.insert(cursor.to_string()) {
        warn!("Next link {cursor} was already fetched; stopping pagination");
      } else {
        self.pending = Some(request.with_url(cursor.into_url()));
      }
    }

    Some(Ok(envelope))
  }

  /// Fetch every remaining page and concatenate the items. Array bodies are
  /// flattened, null bodies skipped and anything else kept as one item.
  pub async fn collect_all(mut self) -> Result<CollectedPages, HttpFailure> {
    let mut items = Vec::new();
    let mut last = None;

    while let Some(page) = self.next_page().await {
      let mut envelope = page?;
      match std::mem::take(&mut envelope.body) {
        Value::Array(values) => items.extend(values),
        Value::Null => {}
        other => items.push(other),
      }
      last = Some(envelope);
    }

    debug!("Collected {} items across {} pages", items.len(), self.page);
    Ok(CollectedPages {
      items,
      last,
      stats: self.stats,
    })
  }

  /// The first page fails as itself; later pages abort the collection.
  fn wrap_failure(&self, failure: HttpFailure) -> HttpFailure {
    match failure {
      HttpFailure::Cancelled | HttpFailure::DeadlineExceeded { .. } => failure,
      _ if self.page <= 1 => failure,
      _ => {
        warn!("Page {} failed; discarding {} pages already fetched", self.page, self.page - 1);
        HttpFailure::PaginationAborted {
          page: self.page,
          source: Box::new(failure),
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use serde_json::json;
  use wiremock::matchers::{method, path, query_param, query_param_is_missing};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::auth::Credential;
  use crate::context::CancellationToken;
  use crate::request::{RequestBuilder, RequestSpec};

  fn link(server: &MockServer, page: u32) -> String {
    format!(
      "<{}/repos/o/r/issues?page={page}>; rel=\"next\", <{}/repos/o/r/issues?page=9>; rel=\"last\"",
      server.uri(),
      server.uri()
    )
  }

  fn first_request(server: &MockServer) -> PhysicalRequest {
    RequestBuilder::new(server.uri(), "application/vnd.github.v3+json")
      .build(&RequestSpec::get("repos/o/r/issues").build(), Credential::Anonymous)
      .unwrap()
  }

  async fn mount_page(server: &MockServer, page: Option<u32>, items: Value, next: Option<u32>) {
    let mut response = ResponseTemplate::new(200).set_body_json(items);
    if let Some(next) = next {
      response = response.insert_header("Link", link(server, next).as_str());
    }
    let mock = Mock::given(method("GET")).and(path("/repos/o/r/issues"));
    let mock = match page {
      Some(page) => mock.and(query_param("page", page.to_string())).respond_with(response),
      None => mock.and(query_param_is_missing("page")).respond_with(response),
    };
    mock.expect(1).mount(server).await;
  }

  async fn collect(server: &MockServer) -> Result<CollectedPages, HttpFailure> {
    let retry = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50));
    let executor = Executor::new(Duration::from_secs(5), false).unwrap();
    let ctx = CallContext::new(CancellationToken::new(), Duration::ZERO);
    Paginator::new(&retry, &executor, &ctx, first_request(server)).collect_all().await
  }

  #[test]
  fn test_next_link_target() {
    let value = "<https://api.github.com/repositories/1/issues?page=2>; rel=\"next\", \
                 <https://api.github.com/repositories/1/issues?page=5>; rel=\"last\"";
    assert_eq!(
      next_link_target(value),
      Some("https://api.github.com/repositories/1/issues?page=2")
    );

    let value = "<https://api.github.com/x?page=1>; rel=\"prev\", <https://api.github.com/x?page=1>; rel=\"first\"";
    assert_eq!(next_link_target(value), None);
  }

  #[test]
  fn test_next_link_target_with_commas_in_query() {
    let value = "<https://api.github.com/issues?labels=bug,ui&page=2>; rel=\"next\"";
    assert_eq!(next_link_target(value), Some("https://api.github.com/issues?labels=bug,ui&page=2"));
  }

  #[test]
  fn test_next_page_cursor() {
    let mut headers = ResponseHeaders::default();
    assert!(next_page_cursor(&headers).is_none());

    headers.insert("Link", "<https://api.github.com/user/repos?page=3>; rel=next");
    let cursor = next_page_cursor(&headers).unwrap();
    assert_eq!(cursor.url().query(), Some("page=3"));
  }

  #[tokio::test]
  async fn test_collects_pages_in_order() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, json!([1, 2]), Some(2)).await;
    mount_page(&mock_server, Some(2), json!([3, 4]), Some(3)).await;
    mount_page(&mock_server, Some(3), json!([5]), None).await;

    let pages = collect(&mock_server).await?;

    assert_eq!(pages.items, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
    assert_eq!(pages.stats.pages, 3);
    assert_eq!(pages.stats.physical_requests, 3);
    assert_eq!(pages.last.unwrap().page, Some(3));
    Ok(())
  }

  #[tokio::test]
  async fn test_first_page_failure_is_not_wrapped() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let result = collect(&mock_server).await;
    assert!(matches!(result, Err(HttpFailure::NotFound { .. })));
    Ok(())
  }

  #[tokio::test]
  async fn test_later_page_failure_aborts() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, json!([1, 2]), Some(2)).await;

    Mock::given(method("GET"))
      .and(query_param("page", "2"))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Resource not accessible"})))
      .expect(1)
      .mount(&mock_server)
      .await;

    match collect(&mock_server).await {
      Err(HttpFailure::PaginationAborted { page, source }) => {
        assert_eq!(page, 2);
        assert!(matches!(*source, HttpFailure::AuthFailure { status: 403, .. }));
      }
      other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
  }

  #[tokio::test]
  async fn test_transient_page_failure_is_retried() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, json!(["a"]), Some(2)).await;
    mount_page(&mock_server, Some(3), json!(["c"]), None).await;

    Mock::given(method("GET"))
      .and(query_param("page", "2"))
      .respond_with(ResponseTemplate::new(503))
      .up_to_n_times(1)
      .with_priority(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(query_param("page", "2"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!(["b"]))
          .insert_header("Link", link(&mock_server, 3).as_str()),
      )
      .mount(&mock_server)
      .await;

    let pages = collect(&mock_server).await?;

    assert_eq!(pages.items, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(pages.stats.physical_requests, 4);
    assert_eq!(pages.stats.retries, 1);
    Ok(())
  }

  #[tokio::test]
  async fn test_repeated_cursor_stops() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, json!([1]), Some(2)).await;
    // Page 2 points back at itself
    mount_page(&mock_server, Some(2), json!([2]), Some(2)).await;

    let pages = collect(&mock_server).await?;

    assert_eq!(pages.items, vec![json!(1), json!(2)]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_non_array_pages_are_single_items() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, None, json!({"total_count": 1}), None).await;

    let pages = collect(&mock_server).await?;
    assert_eq!(pages.items, vec![json!({"total_count": 1})]);
    Ok(())
  }

  #[tokio::test]
  async fn test_next_page_is_lazy() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(query_param_is_missing("page"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!([1]))
          .insert_header("Link", link(&mock_server, 2).as_str()),
      )
      .mount(&mock_server)
      .await;

    let retry = RetryPolicy::new(1, Duration::ZERO, Duration::ZERO);
    let executor = Executor::new(Duration::from_secs(5), false)?;
    let ctx = CallContext::new(CancellationToken::new(), Duration::ZERO);
    let mut paginator = Paginator::new(&retry, &executor, &ctx, first_request(&mock_server));

    let first = paginator.next_page().await.unwrap()?;
    assert_eq!(first.page, Some(1));
    assert_eq!(paginator.pages(), 1);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    Ok(())
  }
}
