//! # Client Creation
//!
//! Builds the runtime and the GitHub client for CLI commands, and wires
//! Ctrl-C to call cancellation.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use octorest_core::{EngineConfig, get_config_dirs};
use octorest_gh::{CancellationToken, GitHubClient};
use tokio::runtime::Runtime;
use tracing::warn;

use crate::progress::SpinnerProgress;

/// Exit status after a second interrupt, as a shell reports SIGINT
const EXIT_INTERRUPTED: i32 = 130;

/// Load the engine configuration with environment and command-line
/// overrides applied
pub fn load_config(host: Option<&str>) -> Result<EngineConfig> {
  let config_dirs = get_config_dirs()?;
  let config = config_dirs
    .load_engine_config()
    .context("Failed to load octorest configuration")?;
  Ok(config.with_env_overrides().with_host_override(host))
}

/// Creates a tokio runtime and a GitHub client
///
/// The client's default credential comes from `GITHUB_TOKEN` or `~/.netrc`;
/// background progress is drawn as a terminal spinner.
pub fn create_runtime_and_client(host: Option<&str>) -> Result<(Runtime, GitHubClient)> {
  let rt = Runtime::new().context("Failed to create async runtime")?;
  let config = load_config(host)?;
  let client = GitHubClient::from_environment(config)
    .context("Failed to create GitHub client")?
    .with_progress(Arc::new(SpinnerProgress::new()));
  Ok((rt, client))
}

/// Run `work` on `rt`, cancelling its token when the user presses Ctrl-C.
/// A second Ctrl-C exits the process.
pub fn block_on_cancellable<T, F, Fut>(rt: &Runtime, work: F) -> T
where
  F: FnOnce(CancellationToken) -> Fut,
  Fut: Future<Output = T>,
{
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();

  rt.block_on(async move {
    let watcher = tokio::spawn(watch_interrupts(
      || async { tokio::signal::ctrl_c().await.is_ok() },
      trigger,
      || std::process::exit(EXIT_INTERRUPTED),
    ));

    let output = work(cancel).await;
    watcher.abort();
    output
  })
}

/// Cancel `trigger` on the first interrupt and call `force_exit` on the
/// second. `next_interrupt` resolves to false when interrupts cannot be
/// observed.
async fn watch_interrupts<S, Fut, X>(mut next_interrupt: S, trigger: CancellationToken, force_exit: X)
where
  S: FnMut() -> Fut,
  Fut: Future<Output = bool>,
  X: FnOnce(),
{
  if !next_interrupt().await {
    return;
  }
  warn!("Interrupted, cancelling the in-flight call (press Ctrl-C again to exit)");
  trigger.cancel();

  if next_interrupt().await {
    warn!("Interrupted again, exiting");
    force_exit();
  }
}
