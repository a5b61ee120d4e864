//! Evaluation runner integration.
//!
//! The evaluation itself runs inside the external `agentbeats-runner` container.
//! This module covers what happens around it:
//!
//! ```text
//! Scenario → runner-scenario.toml → agents healthy? → runner → score.json
//! ```
//!
//! 1. Renders the runner scenario, which addresses agents by URL instead of image
//! 2. Polls agent card endpoints until every agent is ready
//! 3. Reads and checks the result file the runner writes
//!
//! # Example
//!
//! ```ignore
//! use agentbeats_compose::runner::{wait_for_all, EvaluationResult, HealthProbeConfig, RunnerScenario};
//!
//! let runner = RunnerScenario::from_path("runner-scenario.toml")?;
//! wait_for_all(&runner.endpoints(), &HealthProbeConfig::default()).await?;
//!
//! let result = EvaluationResult::from_path("output/score.json")?;
//! result.check(Some(0.5))?;
//! ```

pub mod health;
pub mod result;
pub mod scenario;

pub use health::{
    agent_card_url, build_client, wait_for_agent, wait_for_all, AgentCard, AgentHealth,
    HealthProbeConfig, AGENT_CARD_PATH,
};
pub use result::EvaluationResult;
pub use scenario::{
    render_runner_scenario, RunnerAgent, RunnerParticipant, RunnerScenario, RUNNER_SCENARIO_FILE,
};
