//! # Assignee Endpoints
//!
//! Listing the users who can be assigned issues in a repository, and checking
//! a single login.

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::decode;
use crate::client::GitHubClient;
use crate::context::CancellationToken;
use crate::error::HttpFailure;
use crate::models::{GitHubUser, RepositoryCoordinates};
use crate::request::RequestSpec;
use crate::utils::validate_login;

impl GitHubClient {
  /// List every available assignee of a repository, across all pages
  #[instrument(skip(self, cancel), level = "debug")]
  pub async fn list_assignees(
    &self,
    repo: &RepositoryCoordinates,
    no_status: bool,
    cancel: &CancellationToken,
  ) -> Result<Vec<GitHubUser>> {
    let spec = RequestSpec::get(format!("{}/assignees?per_page=100", repo.fragment()))
      .description(format!("Listing assignees of {repo}"))
      .event_name("assignees.list")
      .multiple_pages(true)
      .no_status(no_status)
      .build();

    let output = self
      .invoke(spec, cancel)
      .await
      .with_context(|| format!("Failed to list assignees for {repo}"))?;
    decode(output.body, "assignees")
  }

  /// Whether `login` can be assigned issues in the repository.
  ///
  /// GitHub answers 204 for assignable users and 404 otherwise, so
  /// `NotFound` is a negative answer rather than an error.
  #[instrument(skip(self, cancel), level = "debug")]
  pub async fn check_assignee(
    &self,
    repo: &RepositoryCoordinates,
    login: &str,
    cancel: &CancellationToken,
  ) -> Result<bool> {
    let login = validate_login(login)?;
    let spec = RequestSpec::get(format!("{}/assignees/{login}", repo.fragment()))
      .description(format!("Checking whether {login} can be assigned in {repo}"))
      .event_name("assignees.check")
      .no_status(true)
      .build();

    match self.invoke(spec, cancel).await {
      Ok(_) => Ok(true),
      Err(HttpFailure::NotFound { message }) => {
        debug!("{login} is not assignable in {repo}: {message}");
        Ok(false)
      }
      Err(e) => Err(e).with_context(|| format!("Failed to check assignee {login} for {repo}")),
    }
  }
}
