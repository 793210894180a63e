//! # GitHub Utility Functions
//!
//! Parsing and validation of repository coordinates and logins before they
//! are spliced into URI fragments.

use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use crate::models::RepositoryCoordinates;

static OWNER_REPO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)/([A-Za-z0-9._-]+)$")
    .expect("Failed to compile owner/repo regex")
});

// Matches patterns like:
// https://github.com/owner/repo
// https://ghe.example.com/owner/repo.git
// git@github.com:owner/repo.git
static REPO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:https?://|ssh://)?(?:[^@/]+@)?[^/:]+[/:]([^/]+)/([^/#?]+?)(?:\.git)?(?:[/#?].*)?$")
    .expect("Failed to compile repository URL regex")
});

static LOGIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\[bot\])?$").expect("Failed to compile login regex")
});

/// Parse `owner/repo` or a repository URL into coordinates
pub fn parse_repository(input: &str) -> Result<RepositoryCoordinates> {
  let input = input.trim();

  if let Some(captures) = OWNER_REPO_REGEX.captures(input) {
    return checked(&captures[1], &captures[2], input);
  }

  if input.contains(':')
    && let Some(captures) = REPO_URL_REGEX.captures(input)
  {
    return checked(&captures[1], &captures[2], input);
  }

  bail!("Could not extract owner and repo from '{input}'; expected owner/repo or a repository URL")
}

/// Reject logins that would change the meaning of a URI fragment
pub fn validate_login(login: &str) -> Result<&str> {
  let login = login.trim();
  if LOGIN_REGEX.is_match(login) {
    Ok(login)
  } else {
    bail!("Invalid GitHub login '{login}'")
  }
}

fn checked(owner: &str, repo: &str, input: &str) -> Result<RepositoryCoordinates> {
  if !LOGIN_REGEX.is_match(owner) {
    bail!("Invalid repository owner '{owner}' in '{input}'");
  }
  if repo == "." || repo == ".." || !repo.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)) {
    bail!("Invalid repository name '{repo}' in '{input}'");
  }
  Ok(RepositoryCoordinates::new(owner, repo))
}

impl FromStr for RepositoryCoordinates {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    parse_repository(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_owner_repo() {
    let coords = parse_repository("octo-org/octorest").unwrap();
    assert_eq!(coords.owner, "octo-org");
    assert_eq!(coords.repo, "octorest");
    assert_eq!(coords.to_string(), "octo-org/octorest");
    assert_eq!(coords.fragment(), "repos/octo-org/octorest");
  }

  #[test]
  fn test_parse_https_url() {
    let coords = parse_repository("https://github.com/octo-org/hello.world.git").unwrap();
    assert_eq!(coords, RepositoryCoordinates::new("octo-org", "hello.world"));

    let coords = parse_repository("https://github.com/octo-org/octorest/pull/123").unwrap();
    assert_eq!(coords, RepositoryCoordinates::new("octo-org", "octorest"));
  }

  #[test]
  fn test_parse_enterprise_and_ssh_urls() {
    let coords = parse_repository("https://ghe.example.com/team/service").unwrap();
    assert_eq!(coords, RepositoryCoordinates::new("team", "service"));

    let coords = parse_repository("git@github.com:octo-org/octorest.git").unwrap();
    assert_eq!(coords, RepositoryCoordinates::new("octo-org", "octorest"));
  }

  #[test]
  fn test_parse_invalid() {
    assert!(parse_repository("only-owner").is_err());
    assert!(parse_repository("https://github.com/only-owner").is_err());
    assert!(parse_repository("owner/repo/extra").is_err());
    assert!(parse_repository("-bad/repo").is_err());
    assert!(parse_repository("owner/..").is_err());
  }

  #[test]
  fn test_validate_login() {
    assert_eq!(validate_login(" octocat ").unwrap(), "octocat");
    assert!(validate_login("dependabot[bot]").is_ok());
    assert!(validate_login("../admin").is_err());
    assert!(validate_login("a b").is_err());
    assert!(validate_login("").is_err());
  }

  #[test]
  fn test_from_str() {
    let coords: RepositoryCoordinates = "o/r".parse().unwrap();
    assert_eq!(coords.repo, "r");
  }
}
