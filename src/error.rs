//! Error types for agentbeats-compose operations.
//!
//! Defines error types for all major subsystems:
//! - Scenario parsing and validation
//! - Writing the generated deployment bundle
//! - Agent card health probing
//! - Reading evaluation results

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading or validating a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Required field '{0}' not found in TOML")]
    MissingField(String),

    #[error("At least one participant role is required")]
    NoParticipants,

    #[error("Invalid port for '{field}': {value} (must be between 1 and 65535)")]
    InvalidPort { field: String, value: i64 },

    #[error("Field '{0}' must not be empty")]
    EmptyField(String),

    #[error("Invalid role name '{name}': {reason}")]
    InvalidRoleName { name: String, reason: String },

    #[error("Participant role '{0}' is declared more than once")]
    DuplicateRole(String),

    #[error("Invalid environment variable name '{name}' in '{field}'")]
    InvalidEnvVarName { field: String, name: String },

    #[error("Environment variable '{name}' is declared more than once in '{field}'")]
    DuplicateEnvVar { field: String, name: String },

    #[error("Failed to read scenario file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors that can occur while writing a generated bundle to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
}

/// Errors that can occur while probing agent health endpoints.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("No endpoints to probe")]
    NoEndpoints,

    #[error("Agent at '{endpoint}' not healthy after {attempts} attempts in {elapsed:?}: {last_error}")]
    Timeout {
        endpoint: String,
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors that can occur while reading or checking an evaluation result.
#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Failed to read result file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Evaluation did not succeed (status: '{0}')")]
    Unsuccessful(String),

    #[error("Evaluation result has no score but a minimum of {0} was required")]
    MissingScore(f64),

    #[error("Score {score} is below the required minimum {min}")]
    ScoreBelowThreshold { score: f64, min: f64 },

    #[error("Minimum score must be a finite number, got {0}")]
    InvalidThreshold(f64),
}
