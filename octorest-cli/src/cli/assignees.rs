//! # Assignees Command
//!
//! Lists the assignable users of a repository or checks a single login.

use anyhow::Result;
use clap::{Args, Subcommand};
use octorest_core::output::format_login;
use octorest_core::{print_info, print_success, print_warning};
use octorest_gh::parse_repository;

use crate::clients::{block_on_cancellable, create_runtime_and_client};

/// Command for repository assignees
#[derive(Args, Debug)]
pub struct AssigneesArgs {
  /// GitHub host, e.g. github.com or ghe.example.com
  #[arg(long, global = true)]
  pub host: Option<String>,

  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: AssigneesSubcommands,
}

/// Subcommands for the assignees command
#[derive(Subcommand, Debug)]
pub enum AssigneesSubcommands {
  /// List every assignable user
  #[command(alias = "ls")]
  List {
    /// Repository as OWNER/REPO or a repository URL
    repo: String,

    /// Run without progress reporting
    #[arg(long = "no-status")]
    no_status: bool,
  },

  /// Check whether a user can be assigned
  Check {
    /// Repository as OWNER/REPO or a repository URL
    repo: String,

    /// GitHub login to check
    login: String,
  },
}

/// Handle the assignees command
pub(crate) fn handle_assignees_command(args: AssigneesArgs) -> Result<()> {
  let (rt, client) = create_runtime_and_client(args.host.as_deref())?;

  match args.subcommand {
    AssigneesSubcommands::List { repo, no_status } => {
      let repo = parse_repository(&repo)?;
      let assignees =
        block_on_cancellable(&rt, |cancel| async move { client.list_assignees(&repo, no_status, &cancel).await })?;

      if assignees.is_empty() {
        print_info("No assignable users found.");
      }
      for user in assignees {
        match user.name {
          Some(name) => println!("{} ({name})", format_login(&user.login)),
          None => println!("{}", format_login(&user.login)),
        }
      }
      Ok(())
    }
    AssigneesSubcommands::Check { repo, login } => {
      let repo = parse_repository(&repo)?;
      let assignable = block_on_cancellable(&rt, |cancel| {
        let (repo, login) = (repo.clone(), login.clone());
        async move { client.check_assignee(&repo, &login, &cancel).await }
      })?;

      if assignable {
        print_success(&format!("{} can be assigned in {repo}", format_login(&login)));
      } else {
        print_warning(&format!("{} cannot be assigned in {repo}", format_login(&login)));
      }
      Ok(())
    }
  }
}
