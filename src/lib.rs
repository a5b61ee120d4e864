//! agentbeats-compose: deployment tooling for AgentBeats agent evaluations.
//!
//! This library turns a scenario file describing a green agent (the benchmark
//! orchestrator) and its participant agents into a Docker Compose deployment,
//! probes agent readiness, and reads the evaluation result.

pub mod cli;
pub mod docker;
pub mod error;
pub mod export;
pub mod runner;
pub mod scenario;

// Re-export commonly used types
pub use error::{ExportError, HealthError, ResultError, ScenarioError};
pub use export::ScenarioBundle;
pub use scenario::Scenario;
