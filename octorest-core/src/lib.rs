//! # Octorest Core Library
//!
//! Shared building blocks for the octorest crates: the on-disk engine
//! configuration, credential discovery from `.netrc`, and the coloured output
//! helpers used by the command-line front end.

pub mod config;
pub mod consts;
pub mod creds;
pub mod output;

pub use config::{ConfigDirs, EngineConfig, RetrySettings, get_config_dirs};
pub use creds::Credentials;
pub use output::{ColorMode, print_error, print_info, print_success, print_warning};
