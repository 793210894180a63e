use anyhow::{Context, Result};
use tracing::instrument;

use super::decode;
use crate::client::GitHubClient;
use crate::context::CancellationToken;
use crate::models::GitHubUser;
use crate::request::RequestSpec;
use crate::utils::validate_login;

impl GitHubClient {
  /// Get the current authenticated user
  #[instrument(skip(self, cancel), level = "debug")]
  pub async fn get_current_user(&self, cancel: &CancellationToken) -> Result<GitHubUser> {
    let spec = RequestSpec::get("user")
      .description("Fetching the authenticated user")
      .event_name("users.current")
      .no_status(true)
      .build();

    let output = self.invoke(spec, cancel).await.context("Failed to fetch GitHub user")?;
    decode(output.body, "GitHub user")
  }

  /// Get a user by login
  #[instrument(skip(self, cancel), level = "debug")]
  pub async fn get_user(&self, login: &str, cancel: &CancellationToken) -> Result<GitHubUser> {
    let login = validate_login(login)?;
    let spec = RequestSpec::get(format!("users/{login}"))
      .description(format!("Fetching user {login}"))
      .event_name("users.get")
      .no_status(true)
      .build();

    let output = self
      .invoke(spec, cancel)
      .await
      .with_context(|| format!("Failed to fetch GitHub user {login}"))?;
    decode(output.body, "GitHub user")
  }
}
