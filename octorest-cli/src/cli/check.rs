//! # Check Command
//!
//! Verifies that the default (or given) credential is accepted by GitHub
//! and shows who it belongs to.

use anyhow::Result;
use clap::Args;
use octorest_core::output::{format_login, format_status};
use octorest_core::{print_error, print_info, print_success, print_warning};
use octorest_gh::{CredentialSource, HttpFailure, RequestSpec};

use crate::clients::{block_on_cancellable, create_runtime_and_client};

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
  /// Token to check instead of the default credential
  #[arg(long)]
  pub token: Option<String>,

  /// GitHub host, e.g. github.com or ghe.example.com
  #[arg(long)]
  pub host: Option<String>,
}

/// Handle the check command
pub(crate) fn handle_check_command(args: CheckArgs) -> Result<()> {
  let (rt, client) = create_runtime_and_client(args.host.as_deref())?;

  let explicit = args.token.as_deref().is_some_and(|t| !t.trim().is_empty());
  if !explicit && client.authenticator().source() == &CredentialSource::None {
    print_warning("No GitHub credential found; checking anonymously.");
    println!("Set GITHUB_TOKEN or add a 'github.com' entry to your .netrc file.");
  }

  let mut spec = RequestSpec::get("user")
    .description("Checking GitHub authentication")
    .event_name("cli.check")
    .no_status(true);
  if let Some(token) = &args.token {
    spec = spec.access_token(token);
  }
  let spec = spec.build();

  match block_on_cancellable(&rt, |cancel| async move { client.invoke(spec, &cancel).await }) {
    Ok(output) => {
      print_success("Successfully authenticated with GitHub");
      print_info("GitHub User Information:");
      if let Some(login) = output.body.get("login").and_then(|l| l.as_str()) {
        println!("  Username: {}", format_login(login));
      }
      if let Some(name) = output.body.get("name").and_then(|n| n.as_str()) {
        println!("  Name: {name}");
      }
      if let Some(url) = output.body.get("html_url").and_then(|u| u.as_str()) {
        println!("  Profile: {url}");
      }
      Ok(())
    }
    Err(HttpFailure::AuthFailure { status, message }) => {
      print_error(&format!("Authentication failed (HTTP {}): {message}", format_status(status)));
      anyhow::bail!("GitHub rejected the credential")
    }
    Err(e) => Err(e.into()),
  }
}
