//! Command-line interface for agentbeats-compose.
//!
//! Provides commands for scenario generation and validation, agent readiness
//! checks, and evaluation result inspection.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
