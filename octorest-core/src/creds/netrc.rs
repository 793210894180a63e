//! Helpers for reading credentials stored in `.netrc` files.
//!
//! Both the single-line (`machine host login user password pass`) and the
//! multi-line layouts are accepted, since the file is tokenized as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::creds::Credentials;

/// Returns the path to the `.netrc` file for the provided home directory.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use octorest_core::creds::netrc::get_netrc_path;
///
/// let home = Path::new("/home/user");
/// assert_eq!(get_netrc_path(home), Path::new("/home/user/.netrc"));
/// ```
pub fn get_netrc_path(home: &Path) -> PathBuf {
  home.join(".netrc")
}

/// Parses `.netrc` content and returns credentials for the requested machine.
///
/// Returns `None` when the machine is absent or its entry lacks a `login` or
/// `password`.
pub fn parse_netrc(content: &str, target_machine: &str) -> Option<Credentials> {
  let mut tokens = content.split_whitespace();
  let mut in_target = false;
  let mut username: Option<String> = None;
  let mut password: Option<String> = None;

  while let Some(token) = tokens.next() {
    match token {
      "machine" | "default" => {
        if in_target {
          break;
        }
        in_target = token == "machine" && tokens.next() == Some(target_machine);
      }
      "login" if in_target => username = tokens.next().map(str::to_string),
      "password" if in_target => password = tokens.next().map(str::to_string),
      _ => {}
    }
  }

  match (username, password) {
    (Some(username), Some(password)) => Some(Credentials { username, password }),
    _ => None,
  }
}

/// Reads the `.netrc` file under `home` and looks up `target_machine`.
///
/// A missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn find_credentials(home: &Path, target_machine: &str) -> Result<Option<Credentials>> {
  let path = get_netrc_path(home);
  if !path.exists() {
    return Ok(None);
  }

  let content =
    fs::read_to_string(&path).with_context(|| format!("Failed to read .netrc file at {}", path.display()))?;
  Ok(parse_netrc(&content, target_machine))
}
