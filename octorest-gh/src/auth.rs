//! Credential resolution for engine calls.
//!
//! A call uses, in order: the caller's explicit token, the default credential
//! discovered when the client was configured, or no credential at all.
//! Anonymous calls are valid; GitHub just applies stricter rate limits.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use directories::BaseDirs;
use octorest_core::EngineConfig;
use octorest_core::consts::ENV_GITHUB_TOKEN;
use octorest_core::creds::netrc;
use tracing::debug;
use url::Url;

/// Resolved authentication for one request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
  /// Personal access or installation token, sent as `Authorization: token`.
  Token(String),
  /// Username and password/token pair, sent as HTTP Basic.
  Basic { username: String, password: String },
  Anonymous,
}

impl Credential {
  pub const fn is_anonymous(&self) -> bool {
    matches!(self, Credential::Anonymous)
  }

  /// A token credential, or `None` for a blank token
  pub fn token(token: &str) -> Option<Self> {
    let token = token.trim();
    (!token.is_empty()).then(|| Credential::Token(token.to_string()))
  }

  fn is_blank(&self) -> bool {
    match self {
      Credential::Token(token) => token.trim().is_empty(),
      Credential::Basic { password, .. } => password.is_empty(),
      Credential::Anonymous => false,
    }
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Credential::Token(_) => f.write_str("Token(<redacted>)"),
      Credential::Basic { username, .. } => write!(f, "Basic({username}:<redacted>)"),
      Credential::Anonymous => f.write_str("Anonymous"),
    }
  }
}

/// Where the default credential came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
  Environment,
  Netrc { machine: String },
  Configured,
  None,
}

/// Resolves the credential for each call.
#[derive(Debug, Clone)]
pub struct Authenticator {
  default: Option<Credential>,
  source: CredentialSource,
}

impl Default for Authenticator {
  fn default() -> Self {
    Self::anonymous()
  }
}

impl Authenticator {
  /// Use `default` for calls that bring no token of their own
  pub fn new(default: Option<Credential>) -> Self {
    let default = default.filter(|c| !c.is_anonymous() && !c.is_blank());
    let source = if default.is_some() {
      CredentialSource::Configured
    } else {
      CredentialSource::None
    };
    Self { default, source }
  }

  pub const fn anonymous() -> Self {
    Self {
      default: None,
      source: CredentialSource::None,
    }
  }

  /// Discover the default credential from the process environment and the
  /// user's `.netrc`.
  pub fn from_environment(config: &EngineConfig) -> Result<Self> {
    let env_token = std::env::var(ENV_GITHUB_TOKEN).ok();
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    Self::discover(env_token.as_deref(), home.as_deref(), &config.api_host_name)
  }

  /// Discover the default credential: a non-blank `env_token` first, then a
  /// `.netrc` entry for the API host under `home`.
  pub fn discover(env_token: Option<&str>, home: Option<&Path>, api_host_name: &str) -> Result<Self> {
    if let Some(credential) = env_token.and_then(Credential::token) {
      debug!("Using GitHub token from {ENV_GITHUB_TOKEN}");
      return Ok(Self {
        default: Some(credential),
        source: CredentialSource::Environment,
      });
    }

    if let Some(home) = home {
      for machine in netrc_machines(api_host_name) {
        let found = netrc::find_credentials(home, &machine)
          .with_context(|| format!("Failed to look up .netrc credentials for {machine}"))?;
        if let Some(creds) = found {
          debug!("Using .netrc credentials for machine {machine}");
          return Ok(Self {
            default: Some(Credential::Basic {
              username: creds.username,
              password: creds.password,
            }),
            source: CredentialSource::Netrc { machine },
          });
        }
      }
    }

    debug!("No default GitHub credential found; calls will be anonymous");
    Ok(Self::anonymous())
  }

  /// Pick the credential for one call. Never fails.
  pub fn resolve(&self, explicit: Option<&Credential>) -> Credential {
    if let Some(credential) = explicit.filter(|c| !c.is_anonymous() && !c.is_blank()) {
      return credential.clone();
    }
    self.default.clone().unwrap_or(Credential::Anonymous)
  }

  pub const fn default_credential(&self) -> Option<&Credential> {
    self.default.as_ref()
  }

  pub const fn source(&self) -> &CredentialSource {
    &self.source
  }
}

/// `.netrc` machine names that may hold credentials for an API host.
fn netrc_machines(api_host_name: &str) -> Vec<String> {
  let host = match Url::parse(api_host_name) {
    Ok(url) if matches!(url.scheme(), "http" | "https") => url.host_str().map(str::to_string),
    _ => Some(api_host_name.trim().trim_end_matches('/').to_string()),
  };

  match host {
    Some(host) if !host.is_empty() => {
      let bare = host.strip_prefix("api.").unwrap_or(&host).to_string();
      let mut machines = vec![bare.clone()];
      if bare != host {
        machines.push(host);
      } else {
        machines.push(format!("api.{bare}"));
      }
      machines
    }
    _ => Vec::new(),
  }
}

#[cfg(test)]
mod tests {
  use octorest_test_utils::NetrcGuard;

  use super::*;

  #[test]
  fn test_explicit_token_wins() {
    let auth = Authenticator::new(Some(Credential::Token("default".to_string())));

    let explicit = Credential::Token("explicit".to_string());
    assert_eq!(auth.resolve(Some(&explicit)), explicit);
  }

  #[test]
  fn test_blank_explicit_token_falls_back_to_default() {
    let auth = Authenticator::new(Some(Credential::Token("default".to_string())));

    let blank = Credential::Token("   ".to_string());
    assert_eq!(auth.resolve(Some(&blank)), Credential::Token("default".to_string()));
    assert_eq!(auth.resolve(None), Credential::Token("default".to_string()));
  }

  #[test]
  fn test_anonymous_fallback() {
    let auth = Authenticator::anonymous();
    assert_eq!(auth.resolve(None), Credential::Anonymous);
    assert_eq!(auth.source(), &CredentialSource::None);
  }

  #[test]
  fn test_blank_default_is_ignored() {
    let auth = Authenticator::new(Some(Credential::Token(String::new())));
    assert!(auth.default_credential().is_none());
    assert_eq!(auth.resolve(None), Credential::Anonymous);
  }

  #[test]
  fn test_credential_token_helper() {
    assert_eq!(Credential::token(" abc "), Some(Credential::Token("abc".to_string())));
    assert_eq!(Credential::token(""), None);
  }

  #[test]
  fn test_debug_never_prints_secrets() {
    let token = format!("{:?}", Credential::Token("ghp_secret".to_string()));
    let basic = format!(
      "{:?}",
      Credential::Basic {
        username: "octocat".to_string(),
        password: "hunter2".to_string()
      }
    );

    assert!(!token.contains("ghp_secret"));
    assert!(basic.contains("octocat"));
    assert!(!basic.contains("hunter2"));
  }

  #[test]
  fn test_discover_prefers_environment_token() {
    let guard = NetrcGuard::new("machine github.com\n  login testuser\n  password gh-token\n");

    let auth = Authenticator::discover(Some("env-token"), Some(guard.home_dir()), "github.com").unwrap();
    assert_eq!(auth.resolve(None), Credential::Token("env-token".to_string()));
    assert_eq!(auth.source(), &CredentialSource::Environment);
  }

  #[test]
  fn test_discover_reads_netrc() {
    let guard = NetrcGuard::new("machine github.com\n  login testuser\n  password gh-token\n");

    let auth = Authenticator::discover(Some(""), Some(guard.home_dir()), "github.com").unwrap();
    assert_eq!(
      auth.resolve(None),
      Credential::Basic {
        username: "testuser".to_string(),
        password: "gh-token".to_string(),
      }
    );
    assert_eq!(
      auth.source(),
      &CredentialSource::Netrc {
        machine: "github.com".to_string()
      }
    );
  }

  #[test]
  fn test_discover_without_anything_is_anonymous() {
    let guard = NetrcGuard::new("");

    let auth = Authenticator::discover(None, Some(guard.home_dir()), "github.com").unwrap();
    assert_eq!(auth.resolve(None), Credential::Anonymous);
  }

  #[test]
  fn test_netrc_machines() {
    assert_eq!(netrc_machines("github.com"), vec!["github.com", "api.github.com"]);
    assert_eq!(netrc_machines("https://api.github.com"), vec!["github.com", "api.github.com"]);
    assert_eq!(
      netrc_machines("ghe.example.com"),
      vec!["ghe.example.com", "api.ghe.example.com"]
    );
    assert_eq!(netrc_machines("http://127.0.0.1:8080"), vec!["127.0.0.1", "api.127.0.0.1"]);
  }
}
