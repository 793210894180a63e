//! # Credential Management
//!
//! Discovery of stored GitHub credentials. Only `.netrc` is consulted; the
//! engine treats a missing entry as "no default credential", never as an
//! error.

pub mod netrc;

use std::fmt;

/// Represents credentials for a service
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}
