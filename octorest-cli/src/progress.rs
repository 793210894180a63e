//! # Terminal Progress
//!
//! Spinner shown on stderr while a call runs in the background.

use std::io::IsTerminal;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use octorest_core::output::format_elapsed;
use octorest_gh::ProgressReporter;

/// Progress reporter that draws an indicatif spinner.
#[derive(Debug, Default)]
pub struct SpinnerProgress {
  bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerProgress {
  pub fn new() -> Self {
    Self::default()
  }

  fn spinner(description: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
      .unwrap_or_else(|_| ProgressStyle::default_spinner())
      .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    bar.set_style(style);
    bar.set_message(description.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
  }
}

impl ProgressReporter for SpinnerProgress {
  fn started(&self, description: &str) {
    if !std::io::stderr().is_terminal() {
      return;
    }
    let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = bar.replace(Self::spinner(description)) {
      previous.finish_and_clear();
    }
  }

  fn progress(&self, description: &str, elapsed: Duration) {
    let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(bar) = bar.as_ref() {
      bar.set_message(format!("{description} ({})", format_elapsed(elapsed)));
    }
  }

  fn finished(&self, _description: &str, _elapsed: Duration, _success: bool) {
    if let Some(bar) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take() {
      bar.finish_and_clear();
    }
  }
}
