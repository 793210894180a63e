//! Test utilities shared across the octorest workspace
//!
//! This crate provides common testing infrastructure including:
//! - XDG config directory isolation ([`EnvTestGuard`])
//! - Scoped environment variables ([`EnvVarGuard`])
//! - HOME directory isolation with a seeded `.netrc` ([`NetrcGuard`])
//!
//! The dead_code lint is disabled for this crate because test utilities may
//! not be used by all tests, and the compiler cannot detect usage across crate
//! boundaries in development dependencies.

#![allow(dead_code)]

pub mod env;
pub mod netrc;

pub use env::{EnvTestGuard, EnvVarGuard};
pub use netrc::NetrcGuard;
