//! # Output Formatting
//!
//! Formatted output functions with colors and emojis for user-facing
//! messages printed by the command-line front end.

use std::time::Duration;

use owo_colors::OwoColorize;
use {clap, emojis};

/// Enum representing different color modes for output
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Enable colored output
  Yes,
  /// Enable colored output (alias for Yes)
  Always,
  /// Automatically detect if colors should be used based on terminal
  /// capabilities
  Auto,
  /// Disable colored output
  No,
  /// Disable colored output (alias for No)
  Never,
}

impl ColorMode {
  /// Set the global color override for this mode
  pub fn apply(self) {
    match self {
      ColorMode::Always | ColorMode::Yes => owo_colors::set_override(true),
      ColorMode::Never | ColorMode::No => owo_colors::set_override(false),
      // Leave detection to owo-colors
      ColorMode::Auto => {}
    }
  }
}

/// Helper function to safely get an emoji or fallback to a default character
pub fn get_emoji_or_default(name: &str, default: &str) -> String {
  match emojis::get_by_shortcode(name) {
    Some(emoji) => emoji.to_string(),
    None => default.to_string(),
  }
}

/// Print a success message
pub fn print_success(message: &str) {
  let check = get_emoji_or_default("check_mark", "✓");
  println!("{} {}", check.green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
  let cross = get_emoji_or_default("cross_mark", "✗");
  eprintln!("{} {}", cross.red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
  let warning = get_emoji_or_default("warning", "⚠");
  println!("{} {}", warning.yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
  let info = get_emoji_or_default("information", "ℹ");
  println!("{} {}", info.blue().bold(), message);
}

/// Format an HTTP status code, colored by class
pub fn format_status(status: u16) -> String {
  match status {
    200..=299 => status.green().to_string(),
    300..=399 => status.cyan().to_string(),
    400..=499 => status.yellow().to_string(),
    _ => status.red().to_string(),
  }
}

/// Format a GitHub login
pub fn format_login(login: &str) -> String {
  login.bright_cyan().bold().to_string()
}

/// Format a path or URL
pub fn format_path(path: &str) -> String {
  path.bright_green().to_string()
}

/// Format an elapsed duration as seconds with one decimal
pub fn format_elapsed(elapsed: Duration) -> String {
  format!("{:.1}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_get_emoji_or_default() {
    let result = get_emoji_or_default("check_mark", "✓");
    assert!(!result.is_empty());

    let result = get_emoji_or_default("nonexistent_emoji", "fallback");
    assert_eq!(result, "fallback");
  }

  #[test]
  fn test_format_status_keeps_code() {
    for status in [200, 304, 404, 503] {
      assert!(format_status(status).contains(&status.to_string()));
    }
  }

  #[test]
  fn test_format_elapsed() {
    assert_eq!(format_elapsed(Duration::from_millis(2500)), "2.5s");
    assert_eq!(format_elapsed(Duration::ZERO), "0.0s");
  }

  #[test]
  fn test_format_functions() {
    assert!(format_login("octocat").contains("octocat"));
    assert!(format_path("/tmp/config.toml").contains("/tmp/config.toml"));
  }
}
