//! Environment variable management for testing
//!
//! Guards in this module restore the previous value of every variable they
//! touch when dropped.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use tempfile::TempDir;

/// Sets (or removes) one environment variable for the guard's lifetime
pub struct EnvVarGuard {
  name: &'static str,
  original: Option<OsString>,
}

impl EnvVarGuard {
  /// Set `name` to `value` until the guard is dropped
  pub fn set(name: &'static str, value: impl Into<OsString>) -> Self {
    let original = env::var_os(name);
    unsafe {
      env::set_var(name, value.into());
    }
    Self { name, original }
  }

  /// Remove `name` until the guard is dropped
  pub fn unset(name: &'static str) -> Self {
    let original = env::var_os(name);
    unsafe {
      env::remove_var(name);
    }
    Self { name, original }
  }
}

impl Drop for EnvVarGuard {
  fn drop(&mut self) {
    match &self.original {
      Some(val) => unsafe {
        env::set_var(self.name, val);
      },
      None => unsafe {
        env::remove_var(self.name);
      },
    }
  }
}

/// A test environment that points `XDG_CONFIG_HOME` at a per-test temporary
/// directory
pub struct EnvTestGuard {
  /// The temporary directory backing the XDG config home
  pub temp_dir: TempDir,
  config_home: EnvVarGuard,
}

impl Default for EnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvTestGuard {
  pub const XDG_CONFIG_HOME: &'static str = "XDG_CONFIG_HOME";

  /// Create a new test environment with an overridden XDG config directory
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let config_dir = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_dir).expect("Failed to create config directory");

    let config_home = EnvVarGuard::set(Self::XDG_CONFIG_HOME, config_dir);

    Self { temp_dir, config_home }
  }

  /// Get the path to the XDG config directory
  pub fn config_dir(&self) -> PathBuf {
    self.temp_dir.path().join("config")
  }
}
