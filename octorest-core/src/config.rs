//! # Configuration Management
//!
//! Locates octorest's configuration directory and loads the engine settings
//! stored there as TOML. A missing file is not an error: every setting has a
//! default, and individual keys may be omitted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::consts::{CONFIG_FILE_NAME, DEFAULT_ACCEPT, DEFAULT_API_HOST_NAME, ENV_API_HOST};

/// Represents the configuration directory for the octorest application
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Resolve the platform configuration directory
  pub fn new() -> Result<Self> {
    let proj_dirs =
      ProjectDirs::from("dev", "octorest", "octorest").context("Failed to determine project directories")?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Use an explicit directory instead of the platform default
  pub fn at(config_dir: impl Into<PathBuf>) -> Self {
    Self {
      config_dir: config_dir.into(),
    }
  }

  /// Get the config directory
  pub fn config_dir(&self) -> &Path {
    &self.config_dir
  }

  /// Create the configuration directory if needed
  pub fn init(&self) -> Result<()> {
    fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;
    Ok(())
  }

  /// Get the path to the engine configuration file
  pub fn config_path(&self) -> PathBuf {
    self.config_dir.join(CONFIG_FILE_NAME)
  }

  /// Load the engine configuration from file or return the defaults
  pub fn load_engine_config(&self) -> Result<EngineConfig> {
    let config_path = self.config_path();

    if !config_path.exists() {
      return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read engine config from {}", config_path.display()))?;

    toml::from_str(&content).with_context(|| format!("Failed to parse engine config from {}", config_path.display()))
  }

  /// Save the engine configuration to file
  pub fn save_engine_config(&self, config: &EngineConfig) -> Result<()> {
    let config_path = self.config_path();

    if let Some(parent) = config_path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize engine config to TOML")?;

    fs::write(&config_path, content)
      .with_context(|| format!("Failed to write engine config to {}", config_path.display()))?;

    Ok(())
  }
}

/// Get the configuration directories
pub fn get_config_dirs() -> Result<ConfigDirs> {
  ConfigDirs::new()
}

/// Settings read by the invocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// `github.com`, an Enterprise host name, or a full `http(s)://` API base.
  pub api_host_name: String,
  /// Media type sent in `Accept` when a call does not specify one.
  pub default_accept: String,
  /// Run calls inline without progress reporting unless a call says otherwise.
  pub default_no_status: bool,
  pub disable_telemetry: bool,
  /// Include request bodies in debug logs.
  pub log_request_body: bool,
  /// Timeout for a single physical request.
  pub web_request_timeout_secs: u64,
  /// Wall-clock budget for a logical call, covering all retries and pages.
  pub call_timeout_secs: u64,
  /// How often background calls report progress.
  pub progress_interval_ms: u64,
  pub retry: RetrySettings,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      api_host_name: DEFAULT_API_HOST_NAME.to_string(),
      default_accept: DEFAULT_ACCEPT.to_string(),
      default_no_status: false,
      disable_telemetry: false,
      log_request_body: false,
      web_request_timeout_secs: 60,
      call_timeout_secs: 600,
      progress_interval_ms: 250,
      retry: RetrySettings::default(),
    }
  }
}

impl EngineConfig {
  /// Apply overrides from the process environment
  pub fn with_env_overrides(self) -> Self {
    let host = std::env::var(ENV_API_HOST).ok();
    self.with_host_override(host.as_deref())
  }

  /// Replace the API host when `host` is non-blank
  pub fn with_host_override(mut self, host: Option<&str>) -> Self {
    if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
      self.api_host_name = host.to_string();
    }
    self
  }

  pub const fn web_request_timeout(&self) -> Duration {
    Duration::from_secs(self.web_request_timeout_secs)
  }

  pub const fn call_timeout(&self) -> Duration {
    Duration::from_secs(self.call_timeout_secs)
  }

  pub const fn progress_interval(&self) -> Duration {
    Duration::from_millis(self.progress_interval_ms)
  }
}

/// Backoff and give-up limits for retryable failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  /// Total physical attempts per request, the first one included.
  pub max_attempts: u32,
  pub base_delay_ms: u64,
  /// Upper bound for the exponential backoff. Server hints may exceed it.
  pub max_delay_secs: u64,
  /// Extra polls allowed while the server answers `202 Accepted`.
  pub not_ready_retries: u32,
  pub not_ready_delay_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      max_attempts: 4,
      base_delay_ms: 500,
      max_delay_secs: 60,
      not_ready_retries: 10,
      not_ready_delay_secs: 30,
    }
  }
}

impl RetrySettings {
  pub const fn base_delay(&self) -> Duration {
    Duration::from_millis(self.base_delay_ms)
  }

  pub const fn max_delay(&self) -> Duration {
    Duration::from_secs(self.max_delay_secs)
  }

  pub const fn not_ready_delay(&self) -> Duration {
    Duration::from_secs(self.not_ready_delay_secs)
  }
}
