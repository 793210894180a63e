//! # Octorest CLI Library
//!
//! Command definitions and handlers for the `octorest` binary, plus the
//! terminal progress sink used for background calls.

pub mod cli;
pub mod clients;
pub mod progress;
