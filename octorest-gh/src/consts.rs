//! Constants for the octorest-gh engine

use std::time::Duration;

/// Base URL for the official SaaS GitHub API
pub const API_BASE_URL: &str = "https://api.github.com";

/// User-Agent header value sent with every request
pub const USER_AGENT: &str = concat!("octorest/", env!("CARGO_PKG_VERSION"));

/// Content-Type for serialized request bodies
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Response header carrying GitHub's request identifier
pub const HEADER_REQUEST_ID: &str = "x-github-request-id";

pub const HEADER_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const HEADER_RATE_LIMIT_RESOURCE: &str = "x-ratelimit-resource";

/// Longest server-requested wait honored before a retry
pub const MAX_SERVER_RETRY_HINT: Duration = Duration::from_secs(60 * 60);
