//! Runner scenario generation.
//!
//! The runner does not know about images or ports; it reaches every agent by
//! URL on the shared network. This module rewrites a [`Scenario`] into that form
//! and reads it back.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScenarioError;
use crate::scenario::{AgentSpec, Scenario, GREEN_AGENT_SERVICE};

/// File name of the runner scenario next to docker-compose.yml.
pub const RUNNER_SCENARIO_FILE: &str = "runner-scenario.toml";

const HEADER: &str = "# Auto-generated runner scenario from scenario.toml\n\
                      # Agents are addressed by their service URL on the compose network\n\n";

/// The green agent as the runner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerAgent {
    pub endpoint: String,
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// A participant as the runner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerParticipant {
    pub role: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// A runner scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerScenario {
    pub green_agent: RunnerAgent,
    #[serde(default)]
    pub participants: Vec<RunnerParticipant>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl RunnerScenario {
    /// Loads a runner scenario file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses runner scenario TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    /// All agent endpoints, green agent first.
    pub fn endpoints(&self) -> Vec<String> {
        std::iter::once(self.green_agent.endpoint.clone())
            .chain(self.participants.iter().map(|p| p.endpoint.clone()))
            .collect()
    }
}

/// Renders the runner scenario TOML for a scenario.
///
/// Extra fields and extra sections keep their TOML types and their order in the
/// source file. A generated key (`endpoint`, `role`) wins over an extra field of
/// the same name.
pub fn render_runner_scenario(scenario: &Scenario) -> Result<String, ScenarioError> {
    let mut doc = toml::Table::new();

    // Plain top-level values must precede every table header.
    let (values, sections): (Vec<_>, Vec<_>) = scenario
        .extra_sections
        .iter()
        .partition(|(_, value)| !is_table_like(value));
    for (key, value) in values {
        doc.insert(key.clone(), value.clone());
    }

    let mut green = toml::Table::new();
    green.insert(
        "endpoint".to_string(),
        toml::Value::String(scenario.green_agent.endpoint(GREEN_AGENT_SERVICE)),
    );
    append_agent_fields(&mut green, GREEN_AGENT_SERVICE, &scenario.green_agent)?;
    doc.insert("green_agent".to_string(), toml::Value::Table(green));

    let mut participants = Vec::with_capacity(scenario.participants.len());
    for participant in &scenario.participants {
        let mut entry = toml::Table::new();
        entry.insert(
            "role".to_string(),
            toml::Value::String(participant.name.clone()),
        );
        entry.insert(
            "endpoint".to_string(),
            toml::Value::String(participant.agent.endpoint(&participant.name)),
        );
        append_agent_fields(&mut entry, &participant.name, &participant.agent)?;
        participants.push(toml::Value::Table(entry));
    }
    doc.insert("participants".to_string(), toml::Value::Array(participants));

    for (key, value) in sections {
        doc.insert(key.clone(), value.clone());
    }

    let body = toml::to_string(&doc)?;
    Ok(format!("{}{}", HEADER, body))
}

fn append_agent_fields(
    table: &mut toml::Table,
    service: &str,
    agent: &AgentSpec,
) -> Result<(), ScenarioError> {
    for (key, value) in &agent.extra {
        if table.contains_key(key) {
            warn!(service, key = %key, "Ignoring extra field that collides with a generated key");
            continue;
        }
        table.insert(key.clone(), value.clone());
    }

    if !agent.environment.is_empty() {
        let vars = agent
            .environment
            .iter()
            .map(toml::Value::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        table.insert("environment".to_string(), toml::Value::Array(vars));
    }
    Ok(())
}

fn is_table_like(value: &toml::Value) -> bool {
    match value {
        toml::Value::Table(_) => true,
        toml::Value::Array(items) => !items.is_empty() && items.iter().all(|v| v.is_table()),
        _ => false,
    }
}
