//! # Command Line Interface
//!
//! Defines the CLI structure and command handlers for the octorest tool.

mod assignees;
mod check;
mod config;
mod creds;
mod invoke;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand};
use octorest_core::ColorMode;

/// Top-level CLI command for the octorest tool
#[derive(Parser)]
#[command(name = "octorest")]
#[command(about = "Call the GitHub REST API with retry, pagination and progress")]
#[command(
  long_about = "Octorest sends requests to the GitHub REST API through a single engine that\n\
        resolves credentials, retries rate-limited and transient failures, follows\n\
        pagination links and reports progress for long-running calls."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for the octorest tool
#[derive(Subcommand)]
pub enum Commands {
  /// Send a request to the GitHub REST API
  #[command(long_about = "Sends one logical call to the GitHub REST API and prints the JSON result.\n\n\
            The fragment is the path (and query) after the API base URL, for example\n\
            'repos/octo-org/octorest/issues?state=all'. Use --all-pages to follow\n\
            pagination links and print every item.")]
  #[command(alias = "api")]
  Invoke(invoke::InvokeArgs),

  /// Check GitHub authentication
  #[command(long_about = "Authenticates against the GitHub API and shows the current user.\n\n\
            The token comes from GITHUB_TOKEN or your .netrc file unless --token is given.")]
  Check(check::CheckArgs),

  /// Repository assignees
  #[command(long_about = "List the users who can be assigned issues in a repository, or check\n\
            whether a single user can be assigned.")]
  #[command(arg_required_else_help = true)]
  Assignees(assignees::AssigneesArgs),

  /// Configuration management
  #[command(arg_required_else_help = true)]
  Config(config::ConfigArgs),

  /// Credential management
  #[command(long_about = "Shows where the default GitHub credential comes from.\n\n\
            Credentials are read from the GITHUB_TOKEN environment variable first and\n\
            then from your .netrc file.")]
  #[command(arg_required_else_help = true)]
  Creds(creds::CredsArgs),
}

pub fn handle_cli(cli: Cli) -> Result<()> {
  // Set global color override based on --colors argument
  cli.colors.apply();

  match cli.command {
    Commands::Invoke(invoke) => invoke::handle_invoke_command(invoke),
    Commands::Check(check) => check::handle_check_command(check),
    Commands::Assignees(assignees) => assignees::handle_assignees_command(assignees),
    Commands::Config(config) => config::handle_config_command(config),
    Commands::Creds(creds) => creds::handle_creds_command(creds),
  }
}
