//! # Credentials Command
//!
//! Reports where the default GitHub credential would come from.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use directories::BaseDirs;
use octorest_core::consts::ENV_GITHUB_TOKEN;
use octorest_core::creds::netrc::get_netrc_path;
use octorest_core::output::format_path;
use octorest_core::{print_info, print_success, print_warning};
use octorest_gh::{Authenticator, CredentialSource};

use crate::clients::load_config;

/// Command for credential management
#[derive(Args, Debug)]
pub struct CredsArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: CredsSubcommands,
}

/// Subcommands for the creds command
#[derive(Subcommand, Debug)]
pub enum CredsSubcommands {
  /// Check which credential the engine will use
  #[command(long_about = "Checks which default credential the engine will use.\n\n\
            GITHUB_TOKEN takes precedence; otherwise the .netrc entry for the API host\n\
            is used. File permissions of .netrc are checked as well.")]
  Check,
}

/// Handle the creds command
pub(crate) fn handle_creds_command(creds: CredsArgs) -> Result<()> {
  match creds.subcommand {
    CredsSubcommands::Check => handle_check_command(),
  }
}

fn handle_check_command() -> Result<()> {
  let config = load_config(None)?;
  let home = BaseDirs::new()
    .map(|dirs| dirs.home_dir().to_path_buf())
    .context("Failed to determine home directory")?;
  let netrc_path = get_netrc_path(&home);

  if netrc_path.exists() {
    check_netrc_permissions(&netrc_path)?;
  } else {
    print_info(&format!(
      "No .netrc file found at {}",
      format_path(&netrc_path.display().to_string())
    ));
  }

  let env_token = std::env::var(ENV_GITHUB_TOKEN).ok();
  let authenticator = Authenticator::discover(env_token.as_deref(), Some(&home), &config.api_host_name)?;
  print_source(authenticator.source(), &config.api_host_name);
  Ok(())
}

fn print_source(source: &CredentialSource, host: &str) {
  match source {
    CredentialSource::Environment => print_success(&format!("Using the token from {ENV_GITHUB_TOKEN}.")),
    CredentialSource::Netrc { machine } => {
      print_success(&format!("Using .netrc credentials for machine '{machine}'."));
    }
    CredentialSource::Configured => print_success("Using the configured credential."),
    CredentialSource::None => {
      print_warning(&format!("No GitHub credential found for {host}; calls will be anonymous."));
      println!("Set {ENV_GITHUB_TOKEN} or add an entry to your .netrc file:");
      println!("```");
      println!("machine github.com");
      println!("  login your-github-username");
      println!("  password your-github-token");
      println!("```");
    }
  }
}

#[cfg(unix)]
fn check_netrc_permissions(path: &Path) -> Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mode = std::fs::metadata(path)
    .with_context(|| format!("Failed to read metadata for {}", path.display()))?
    .permissions()
    .mode();

  if mode & 0o077 != 0 {
    print_warning("Your .netrc file has insecure permissions.");
    println!("For security, change permissions to 600: chmod 600 {}", path.display());
  } else {
    print_success(".netrc file has secure permissions.");
  }
  Ok(())
}

#[cfg(not(unix))]
fn check_netrc_permissions(_path: &Path) -> Result<()> {
  Ok(())
}
