//! # Config Command
//!
//! Shows, initializes and locates the engine configuration file.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use octorest_core::output::format_path;
use octorest_core::{ConfigDirs, EngineConfig, get_config_dirs, print_info, print_success};

/// Command for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: ConfigSubcommands,
}

/// Subcommands for the config command
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommands {
  /// Print the effective configuration as TOML
  #[command(long_about = "Prints the configuration the engine would use, with environment\n\
            overrides (OCTOREST_API_HOST) applied, as TOML.")]
  Show,

  /// Write a configuration file with the default settings
  Init {
    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
  },

  /// Print the path of the configuration file
  Path,
}

/// Handle the config command
pub(crate) fn handle_config_command(args: ConfigArgs) -> Result<()> {
  let config_dirs = get_config_dirs()?;

  match args.subcommand {
    ConfigSubcommands::Show => {
      print!("{}", render_effective_config(&config_dirs)?);
      Ok(())
    }
    ConfigSubcommands::Init { force } => {
      let path = config_dirs.config_path();
      if init_config(&config_dirs, force)? {
        print_success("Initialized octorest configuration:");
      } else {
        print_info("Configuration already exists (use --force to overwrite):");
      }
      println!("  Config: {}", format_path(&path.display().to_string()));
      Ok(())
    }
    ConfigSubcommands::Path => {
      println!("{}", config_dirs.config_path().display());
      Ok(())
    }
  }
}

fn render_effective_config(config_dirs: &ConfigDirs) -> Result<String> {
  let config = config_dirs.load_engine_config()?.with_env_overrides();
  toml::to_string_pretty(&config).context("Failed to serialize engine config to TOML")
}

/// Write the default configuration; returns false when a file already
/// exists and `force` is not set
fn init_config(config_dirs: &ConfigDirs, force: bool) -> Result<bool> {
  config_dirs.init()?;
  if config_dirs.config_path().exists() && !force {
    return Ok(false);
  }
  config_dirs.save_engine_config(&EngineConfig::default())?;
  Ok(true)
}
