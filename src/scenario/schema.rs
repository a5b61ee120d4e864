//! Scenario schema definitions for agent evaluations.
//!
//! This module defines the raw TOML shape of a scenario file and the validated
//! types that the generators consume. Raw types keep every field optional so that
//! missing fields can be reported with their full dotted path.

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

/// Service name reserved for the green agent.
pub const GREEN_AGENT_SERVICE: &str = "green-agent";

/// Service name reserved for the evaluation runner.
pub const RUNNER_SERVICE: &str = "agentbeats-runner";

/// Service names that participant roles may not use.
const RESERVED_SERVICE_NAMES: [&str; 2] = [GREEN_AGENT_SERVICE, RUNNER_SERVICE];

/// An environment variable declared for an agent container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name as seen inside the container.
    pub name: String,
    /// Default value. A variable without a default is a required secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<toml::Value>,
}

impl EnvVar {
    /// Creates a required variable (no default).
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Creates an optional variable with a default value.
    pub fn with_default(name: impl Into<String>, default: impl Into<toml::Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Returns true if the variable has no default and must be supplied.
    pub fn is_secret(&self) -> bool {
        self.default.is_none()
    }

    /// Returns the default rendered as plain text.
    ///
    /// Strings are returned verbatim; other values use their TOML rendering.
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// A validated agent container definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    /// Docker image to pull.
    pub image: String,
    /// Port the agent listens on inside the network.
    pub port: u16,
    /// Environment variables in declaration order.
    pub environment: Vec<EnvVar>,
    /// Fields not used for the container itself, forwarded to the runner.
    pub extra: toml::Table,
}

impl AgentSpec {
    /// Creates an agent with no environment and no extra fields.
    pub fn new(image: impl Into<String>, port: u16) -> Self {
        Self {
            image: image.into(),
            port,
            environment: Vec::new(),
            extra: toml::Table::new(),
        }
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, var: EnvVar) -> Self {
        self.environment.push(var);
        self
    }

    /// Adds an extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// URL under which the agent is reachable from other services.
    pub fn endpoint(&self, host: &str) -> String {
        format!("http://{}:{}", host, self.port)
    }
}

/// A participant (purple agent) bound to a role name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSpec {
    /// Role name, also used as the compose service and host name.
    pub name: String,
    /// Container definition.
    pub agent: AgentSpec,
}

impl ParticipantSpec {
    pub fn new(name: impl Into<String>, agent: AgentSpec) -> Self {
        Self {
            name: name.into(),
            agent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawScenario {
    pub green_agent: Option<RawGreenAgent>,
    pub participants: Option<RawParticipants>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGreenAgent {
    pub image: Option<String>,
    pub port: Option<i64>,
    #[serde(default)]
    pub environment: Vec<RawEnvVar>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawParticipants {
    #[serde(default)]
    pub required_roles: Vec<RawRole>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRole {
    pub name: Option<String>,
    pub image: Option<String>,
    pub port: Option<i64>,
    #[serde(default)]
    pub environment: Vec<RawEnvVar>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvVar {
    pub name: Option<String>,
    pub default: Option<toml::Value>,
}

/// Checks that every required field is present, in file order.
///
/// The first missing field wins, matching how a reader walks the file top to bottom.
pub(crate) fn check_required_fields(raw: &RawScenario) -> Result<(), ScenarioError> {
    let green = raw
        .green_agent
        .as_ref()
        .ok_or_else(|| ScenarioError::MissingField("green_agent".to_string()))?;
    if green.image.is_none() {
        return Err(ScenarioError::MissingField("green_agent.image".to_string()));
    }
    if green.port.is_none() {
        return Err(ScenarioError::MissingField("green_agent.port".to_string()));
    }

    let roles = raw
        .participants
        .as_ref()
        .map(|p| p.required_roles.as_slice())
        .unwrap_or_default();
    if roles.is_empty() {
        return Err(ScenarioError::NoParticipants);
    }

    for (i, role) in roles.iter().enumerate() {
        let missing = [
            ("name", role.name.is_none()),
            ("image", role.image.is_none()),
            ("port", role.port.is_none()),
        ]
        .into_iter()
        .find(|(_, missing)| *missing);
        if let Some((field, _)) = missing {
            return Err(ScenarioError::MissingField(format!(
                "participants.required_roles[{}].{}",
                i, field
            )));
        }
    }

    Ok(())
}

pub(crate) fn validate_image(field: &str, image: &str) -> Result<String, ScenarioError> {
    let trimmed = image.trim();
    if trimmed.is_empty() {
        return Err(ScenarioError::EmptyField(field.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_port(field: &str, port: i64) -> Result<u16, ScenarioError> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(ScenarioError::InvalidPort {
            field: field.to_string(),
            value: port,
        }),
    }
}

/// Validates a participant role name for use as a compose service and host name.
pub(crate) fn validate_role_name(name: &str) -> Result<(), ScenarioError> {
    let invalid = |reason: &str| ScenarioError::InvalidRoleName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !c.is_ascii_alphanumeric() => {
            return Err(invalid("must start with a letter or digit"))
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err(invalid(
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    if RESERVED_SERVICE_NAMES.contains(&name) {
        return Err(invalid("is reserved for a generated service"));
    }
    Ok(())
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Converts raw environment entries, rejecting bad or repeated names.
pub(crate) fn validate_environment(
    field: &str,
    raw: Vec<RawEnvVar>,
) -> Result<Vec<EnvVar>, ScenarioError> {
    let mut vars: Vec<EnvVar> = Vec::with_capacity(raw.len());
    for (i, entry) in raw.into_iter().enumerate() {
        let name = entry
            .name
            .ok_or_else(|| ScenarioError::MissingField(format!("{}[{}].name", field, i)))?;
        if !is_valid_env_name(&name) {
            return Err(ScenarioError::InvalidEnvVarName {
                field: field.to_string(),
                name,
            });
        }
        if vars.iter().any(|v| v.name == name) {
            return Err(ScenarioError::DuplicateEnvVar {
                field: field.to_string(),
                name,
            });
        }
        vars.push(EnvVar {
            name,
            default: entry.default,
        });
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_default_text() {
        assert_eq!(EnvVar::required("KEY").default_text(), None);
        assert_eq!(
            EnvVar::with_default("LEVEL", "info").default_text(),
            Some("info".to_string())
        );
        assert_eq!(
            EnvVar::with_default("ROUNDS", 3i64).default_text(),
            Some("3".to_string())
        );
        assert_eq!(
            EnvVar::with_default("VERBOSE", true).default_text(),
            Some("true".to_string())
        );
    }

    #[test]
    fn test_agent_endpoint() {
        let agent = AgentSpec::new("ghcr.io/org/agent:latest", 9009);
        assert_eq!(agent.endpoint("green-agent"), "http://green-agent:9009");
    }

    #[test]
    fn test_validate_port_range() {
        assert_eq!(validate_port("p", 1).unwrap(), 1);
        assert_eq!(validate_port("p", 65535).unwrap(), 65535);
        assert!(matches!(
            validate_port("p", 0),
            Err(ScenarioError::InvalidPort { value: 0, .. })
        ));
        assert!(validate_port("p", 70000).is_err());
        assert!(validate_port("p", -1).is_err());
    }

    #[test]
    fn test_validate_role_name() {
        assert!(validate_role_name("purple").is_ok());
        assert!(validate_role_name("agent_1.v2-x").is_ok());
        assert!(validate_role_name("").is_err());
        assert!(validate_role_name("-leading").is_err());
        assert!(validate_role_name("has space").is_err());
        assert!(validate_role_name("green-agent").is_err());
        assert!(validate_role_name("agentbeats-runner").is_err());
    }

    #[test]
    fn test_env_names() {
        assert!(is_valid_env_name("OPENAI_API_KEY"));
        assert!(is_valid_env_name("_private"));
        assert!(!is_valid_env_name("1BAD"));
        assert!(!is_valid_env_name("BAD-NAME"));
        assert!(!is_valid_env_name(""));
    }

    #[test]
    fn test_validate_environment_rejects_duplicates() {
        let raw = vec![
            RawEnvVar {
                name: Some("KEY".to_string()),
                default: None,
            },
            RawEnvVar {
                name: Some("KEY".to_string()),
                default: Some(toml::Value::String("x".to_string())),
            },
        ];
        let err = validate_environment("green_agent.environment", raw).unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateEnvVar { ref name, .. } if name == "KEY"));
    }

    #[test]
    fn test_validate_environment_missing_name() {
        let raw = vec![RawEnvVar {
            name: None,
            default: None,
        }];
        let err = validate_environment("green_agent.environment", raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required field 'green_agent.environment[0].name' not found in TOML"
        );
    }
}
