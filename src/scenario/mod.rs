//! Scenario definitions for AgentBeats evaluations.
//!
//! A scenario file names the green agent (the benchmark orchestrator) and the
//! participant roles (the purple agents under evaluation), with the images,
//! ports and environment each container needs. Loading a scenario validates it
//! once so the generators can work from plain, fully populated types.
//!
//! # Example
//!
//! ```ignore
//! use agentbeats_compose::scenario::Scenario;
//!
//! let scenario = Scenario::from_path("scenario.toml")?;
//! for name in scenario.service_names() {
//!     println!("service: {}", name);
//! }
//! ```

pub mod schema;
pub mod starter;

pub use schema::{AgentSpec, EnvVar, ParticipantSpec, GREEN_AGENT_SERVICE, RUNNER_SERVICE};
pub use starter::STARTER_SCENARIO;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ScenarioError;
use schema::{
    check_required_fields, validate_environment, validate_image, validate_port,
    validate_role_name, RawScenario,
};

/// A validated evaluation scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// The benchmark orchestrator.
    pub green_agent: AgentSpec,
    /// Participant roles in declaration order.
    pub participants: Vec<ParticipantSpec>,
    /// Top-level sections other than `green_agent` and `participants`.
    pub extra_sections: toml::Table,
}

/// An environment variable paired with the service that declares it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceVariable<'a> {
    pub service: &'a str,
    pub var: &'a EnvVar,
}

impl Scenario {
    /// Creates a scenario from already validated parts.
    pub fn new(green_agent: AgentSpec, participants: Vec<ParticipantSpec>) -> Self {
        Self {
            green_agent,
            participants,
            extra_sections: toml::Table::new(),
        }
    }

    /// Loads and validates a scenario file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "Read scenario file");
        Self::from_toml_str(&content)
    }

    /// Parses and validates scenario TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        let raw: RawScenario = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawScenario) -> Result<Self, ScenarioError> {
        check_required_fields(&raw)?;

        let RawScenario {
            green_agent,
            participants,
            extra,
        } = raw;
        let green =
            green_agent.ok_or_else(|| ScenarioError::MissingField("green_agent".into()))?;

        let green_agent = AgentSpec {
            image: validate_image(
                "green_agent.image",
                green.image.as_deref().unwrap_or_default(),
            )?,
            port: validate_port("green_agent.port", green.port.unwrap_or_default())?,
            environment: validate_environment("green_agent.environment", green.environment)?,
            extra: green.extra,
        };

        let roles = participants.unwrap_or_default().required_roles;
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(roles.len());
        for (i, role) in roles.into_iter().enumerate() {
            let prefix = format!("participants.required_roles[{}]", i);
            let name = role.name.unwrap_or_default();
            validate_role_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(ScenarioError::DuplicateRole(name));
            }

            let agent = AgentSpec {
                image: validate_image(
                    &format!("{}.image", prefix),
                    role.image.as_deref().unwrap_or_default(),
                )?,
                port: validate_port(&format!("{}.port", prefix), role.port.unwrap_or_default())?,
                environment: validate_environment(
                    &format!("{}.environment", prefix),
                    role.environment,
                )?,
                extra: role.extra,
            };
            specs.push(ParticipantSpec { name, agent });
        }

        debug!(
            participants = specs.len(),
            extra_sections = extra.len(),
            "Validated scenario"
        );

        Ok(Self {
            green_agent,
            participants: specs,
            extra_sections: extra,
        })
    }

    /// All agent services as `(service name, spec)`, green agent first.
    pub fn agents(&self) -> impl Iterator<Item = (&str, &AgentSpec)> {
        std::iter::once((GREEN_AGENT_SERVICE, &self.green_agent)).chain(
            self.participants
                .iter()
                .map(|p| (p.name.as_str(), &p.agent)),
        )
    }

    /// Names of all agent services, green agent first.
    pub fn service_names(&self) -> Vec<&str> {
        self.agents().map(|(name, _)| name).collect()
    }

    /// Variables without defaults, in declaration order.
    pub fn required_secrets(&self) -> Vec<ServiceVariable<'_>> {
        self.variables().filter(|sv| sv.var.is_secret()).collect()
    }

    /// Variables with defaults, in declaration order.
    pub fn optional_variables(&self) -> Vec<ServiceVariable<'_>> {
        self.variables().filter(|sv| !sv.var.is_secret()).collect()
    }

    fn variables(&self) -> impl Iterator<Item = ServiceVariable<'_>> {
        self.agents().flat_map(|(service, agent)| {
            agent
                .environment
                .iter()
                .map(move |var| ServiceVariable { service, var })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[green_agent]
image = "ghcr.io/agentbeats/debate-judge:latest"
port = 9009
domain = "debate"

[[green_agent.environment]]
name = "OPENAI_API_KEY"

[[green_agent.environment]]
name = "LOG_LEVEL"
default = "info"

[[participants.required_roles]]
name = "pro_debater"
image = "ghcr.io/agentbeats/debater:latest"
port = 9019

[[participants.required_roles.environment]]
name = "GOOGLE_API_KEY"

[[participants.required_roles]]
name = "con_debater"
image = "ghcr.io/agentbeats/debater:latest"
port = 9018
strategy = "aggressive"

[config]
topic = "Should AI be regulated?"
num_rounds = 3
"#;

    #[test]
    fn test_parse_sample_scenario() {
        let scenario = Scenario::from_toml_str(SAMPLE).unwrap();
        assert_eq!(scenario.green_agent.port, 9009);
        assert_eq!(scenario.green_agent.environment.len(), 2);
        assert_eq!(
            scenario.green_agent.extra.get("domain").and_then(|v| v.as_str()),
            Some("debate")
        );
        assert_eq!(scenario.participants.len(), 2);
        assert_eq!(scenario.participants[1].name, "con_debater");
        assert!(scenario.participants[1].agent.extra.contains_key("strategy"));
        assert!(scenario.extra_sections.contains_key("config"));
    }

    #[test]
    fn test_service_names_order() {
        let scenario = Scenario::from_toml_str(SAMPLE).unwrap();
        assert_eq!(
            scenario.service_names(),
            vec!["green-agent", "pro_debater", "con_debater"]
        );
    }

    #[test]
    fn test_secrets_and_optionals() {
        let scenario = Scenario::from_toml_str(SAMPLE).unwrap();
        let secrets: Vec<_> = scenario
            .required_secrets()
            .iter()
            .map(|sv| (sv.service, sv.var.name.as_str()))
            .collect();
        assert_eq!(
            secrets,
            vec![
                ("green-agent", "OPENAI_API_KEY"),
                ("pro_debater", "GOOGLE_API_KEY")
            ]
        );

        let optional = scenario.optional_variables();
        assert_eq!(optional.len(), 1);
        assert_eq!(optional[0].var.name, "LOG_LEVEL");
    }

    #[test]
    fn test_extra_fields_keep_file_order() {
        let content = r#"
[green_agent]
image = "green"
port = 1
zeta = 1
alpha = 2

[[participants.required_roles]]
name = "p"
image = "purple"
port = 2
"#;
        let scenario = Scenario::from_toml_str(content).unwrap();
        let keys: Vec<&str> = scenario.green_agent.extra.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_missing_green_agent() {
        let err = Scenario::from_toml_str("[config]\nx = 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required field 'green_agent' not found in TOML"
        );
    }

    #[test]
    fn test_missing_green_port() {
        let err = Scenario::from_toml_str("[green_agent]\nimage = \"g\"\n").unwrap_err();
        assert!(matches!(err, ScenarioError::MissingField(ref f) if f == "green_agent.port"));
    }

    #[test]
    fn test_requires_participants() {
        let err =
            Scenario::from_toml_str("[green_agent]\nimage = \"g\"\nport = 9009\n").unwrap_err();
        assert!(matches!(err, ScenarioError::NoParticipants));
    }

    #[test]
    fn test_missing_role_field_reports_index() {
        let content = r#"
[green_agent]
image = "g"
port = 9009

[[participants.required_roles]]
name = "a"
image = "purple"
port = 9010

[[participants.required_roles]]
name = "b"
port = 9011
"#;
        let err = Scenario::from_toml_str(content).unwrap_err();
        assert!(
            matches!(err, ScenarioError::MissingField(ref f) if f == "participants.required_roles[1].image")
        );
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let content = r#"
[green_agent]
image = "g"
port = 9009

[[participants.required_roles]]
name = "a"
image = "purple"
port = 9010

[[participants.required_roles]]
name = "a"
image = "purple"
port = 9011
"#;
        let err = Scenario::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateRole(ref n) if n == "a"));
    }

    #[test]
    fn test_reserved_role_name_rejected() {
        let content = r#"
[green_agent]
image = "g"
port = 9009

[[participants.required_roles]]
name = "agentbeats-runner"
image = "purple"
port = 9010
"#;
        let err = Scenario::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidRoleName { .. }));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let content = r#"
[green_agent]
image = "g"
port = 0

[[participants.required_roles]]
name = "a"
image = "purple"
port = 9010
"#;
        let err = Scenario::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidPort { value: 0, .. }));
    }

    #[test]
    fn test_empty_image_rejected() {
        let content = r#"
[green_agent]
image = "  "
port = 9009

[[participants.required_roles]]
name = "a"
image = "purple"
port = 9010
"#;
        let err = Scenario::from_toml_str(content).unwrap_err();
        assert!(matches!(err, ScenarioError::EmptyField(ref f) if f == "green_agent.image"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Scenario::from_toml_str("[green_agent\nimage =").unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Scenario::from_path("/nonexistent/scenario.toml").unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}
