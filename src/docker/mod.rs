//! Docker deployment generation for AgentBeats scenarios.
//!
//! This module provides utilities for generating the docker-compose.yml that runs
//! a scenario and the `.env.example` listing the secrets it needs.

pub mod compose;
pub mod env_file;

pub use compose::{
    ComposeBuilder, ComposeConfig, ComposeOptions, ComposeService, HealthCheck, NetworkConfig,
    ServiceCondition, ServiceDependency, DEFAULT_NETWORK, DEFAULT_RUNNER_IMAGE,
};
pub use env_file::{has_variables, render_env_example};
