use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents a GitHub user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitHubUser {
  pub login: String,
  pub id: u64,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub html_url: Option<String>,
  #[serde(rename = "type", default)]
  pub user_type: Option<String>,
}

/// Owner and name of a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryCoordinates {
  pub owner: String,
  pub repo: String,
}

impl RepositoryCoordinates {
  pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      repo: repo.into(),
    }
  }

  /// `repos/{owner}/{repo}` fragment used by repository-scoped endpoints
  pub fn fragment(&self) -> String {
    format!("repos/{}/{}", self.owner, self.repo)
  }
}

impl fmt::Display for RepositoryCoordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.repo)
  }
}
