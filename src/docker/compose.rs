//! Docker Compose configuration generation for AgentBeats scenarios.
//!
//! This module turns a validated [`Scenario`] into a docker-compose.yml that
//! starts the green agent, every participant, and the evaluation runner on a
//! shared bridge network. The runner only starts once every agent reports
//! healthy through its agent card endpoint.

use serde::{Deserialize, Serialize};

use crate::runner::health::AGENT_CARD_PATH;
use crate::scenario::{AgentSpec, Scenario, GREEN_AGENT_SERVICE, RUNNER_SERVICE};

/// Compose file format version written to the header.
pub const COMPOSE_VERSION: &str = "3.8";

/// Runner image used when none is configured.
pub const DEFAULT_RUNNER_IMAGE: &str = "ghcr.io/komyo-ai/agentbeats-runner:latest";

/// Network shared by all services.
pub const DEFAULT_NETWORK: &str = "agent-network";

/// Path of the runner scenario inside the runner container.
pub const RUNNER_SCENARIO_MOUNT: &str = "/scenario/scenario.toml";

/// Directory inside the runner container where results are written.
pub const RUNNER_OUTPUT_MOUNT: &str = "/app/output";

/// Health check configuration for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Test command to run.
    pub test: Vec<String>,
    /// Interval between health checks.
    pub interval: String,
    /// Timeout for each health check.
    pub timeout: String,
    /// Number of retries before marking unhealthy.
    pub retries: u32,
    /// Grace period before failures count.
    pub start_period: String,
}

/// Condition attached to a service dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCondition {
    ServiceStarted,
    ServiceHealthy,
}

impl std::fmt::Display for ServiceCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceCondition::ServiceStarted => write!(f, "service_started"),
            ServiceCondition::ServiceHealthy => write!(f, "service_healthy"),
        }
    }
}

/// A dependency on another service, optionally gated on a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDependency {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ServiceCondition>,
}

impl ServiceDependency {
    /// Depends on the service having started.
    pub fn started(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            condition: None,
        }
    }

    /// Depends on the service reporting healthy.
    pub fn healthy(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            condition: Some(ServiceCondition::ServiceHealthy),
        }
    }
}

/// A service definition in docker-compose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    /// Service name.
    pub name: String,
    /// Docker image to use.
    pub image: String,
    /// Container name.
    pub container_name: String,
    /// Volume mounts.
    pub volumes: Vec<String>,
    /// Command arguments passed to the image entrypoint.
    pub command: Vec<String>,
    /// Health check configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheck>,
    /// Environment entries in `NAME=value` form.
    pub environment: Vec<String>,
    /// Service dependencies.
    pub depends_on: Vec<ServiceDependency>,
    /// Networks to connect to.
    pub networks: Vec<String>,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network driver (e.g., "bridge").
    pub driver: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            driver: "bridge".to_string(),
        }
    }
}

/// Complete docker-compose configuration, services kept in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Compose file version.
    pub version: String,
    /// Services in the compose file.
    pub services: Vec<ComposeService>,
    /// Networks defined in the compose file.
    pub networks: Vec<(String, NetworkConfig)>,
}

impl ComposeConfig {
    fn new(network: &str) -> Self {
        Self {
            version: COMPOSE_VERSION.to_string(),
            services: Vec::new(),
            networks: vec![(network.to_string(), NetworkConfig::default())],
        }
    }

    /// Looks up a service by name.
    pub fn service(&self, name: &str) -> Option<&ComposeService> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Service names in insertion order.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Options controlling the generated deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    /// Image for the evaluation runner.
    pub runner_image: String,
    /// Name of the shared network.
    pub network: String,
    /// Host path of the runner scenario, relative to the compose file.
    pub runner_scenario_source: String,
    /// Host directory receiving the runner output.
    pub output_source: String,
    /// Health check interval.
    pub health_interval: String,
    /// Health check timeout.
    pub health_timeout: String,
    /// Health check retries.
    pub health_retries: u32,
    /// Health check start period.
    pub health_start_period: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            runner_image: DEFAULT_RUNNER_IMAGE.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            runner_scenario_source: "./runner-scenario.toml".to_string(),
            output_source: "./output".to_string(),
            health_interval: "5s".to_string(),
            health_timeout: "3s".to_string(),
            health_retries: 10,
            health_start_period: "30s".to_string(),
        }
    }
}

impl ComposeOptions {
    /// Sets the runner image.
    pub fn with_runner_image(mut self, image: impl Into<String>) -> Self {
        self.runner_image = image.into();
        self
    }

    /// Sets the shared network name.
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Sets the host directory receiving the runner output.
    pub fn with_output_source(mut self, source: impl Into<String>) -> Self {
        self.output_source = source.into();
        self
    }

    /// Sets the health check retry count.
    pub fn with_health_retries(mut self, retries: u32) -> Self {
        self.health_retries = retries;
        self
    }
}

/// Builder for generating docker-compose.yml content.
#[derive(Debug, Clone)]
pub struct ComposeBuilder {
    config: ComposeConfig,
    options: ComposeOptions,
}

impl ComposeBuilder {
    /// Create a new ComposeBuilder with no services.
    pub fn new(options: ComposeOptions) -> Self {
        Self {
            config: ComposeConfig::new(&options.network),
            options,
        }
    }

    /// Create a builder holding every service the scenario needs.
    pub fn from_scenario(scenario: &Scenario, options: &ComposeOptions) -> Self {
        let mut builder = Self::new(options.clone());

        builder.add_agent(GREEN_AGENT_SERVICE, &scenario.green_agent);
        for participant in &scenario.participants {
            builder.add_agent(&participant.name, &participant.agent);
        }

        if let Some(green) = builder
            .config
            .services
            .iter_mut()
            .find(|s| s.name == GREEN_AGENT_SERVICE)
        {
            green.depends_on = scenario
                .participants
                .iter()
                .map(|p| ServiceDependency::started(&p.name))
                .collect();
        }

        let agents: Vec<&str> = scenario.service_names();
        builder.add_runner(&agents);
        builder
    }

    /// Add an agent service that serves its agent card on `port`.
    pub fn add_agent(&mut self, name: &str, agent: &AgentSpec) -> &mut Self {
        let port = agent.port.to_string();
        let service = ComposeService {
            name: name.to_string(),
            image: agent.image.clone(),
            container_name: name.to_string(),
            volumes: Vec::new(),
            command: vec![
                "--host".to_string(),
                "0.0.0.0".to_string(),
                "--port".to_string(),
                port,
                "--card-url".to_string(),
                agent.endpoint(name),
            ],
            healthcheck: Some(self.agent_healthcheck(agent.port)),
            environment: agent
                .environment
                .iter()
                .map(|var| match var.default_text() {
                    // `$$` keeps compose from interpolating inside a literal default.
                    Some(default) => format!("{}={}", var.name, default.replace('$', "$$")),
                    None => format!("{}=${{{}}}", var.name, var.name),
                })
                .collect(),
            depends_on: Vec::new(),
            networks: vec![self.options.network.clone()],
        };

        self.config.services.push(service);
        self
    }

    /// Add the evaluation runner, gated on every listed service being healthy.
    pub fn add_runner(&mut self, depends_on: &[&str]) -> &mut Self {
        let service = ComposeService {
            name: RUNNER_SERVICE.to_string(),
            image: self.options.runner_image.clone(),
            container_name: RUNNER_SERVICE.to_string(),
            volumes: vec![
                format!(
                    "{}:{}",
                    self.options.runner_scenario_source, RUNNER_SCENARIO_MOUNT
                ),
                format!("{}:{}", self.options.output_source, RUNNER_OUTPUT_MOUNT),
            ],
            command: vec![
                RUNNER_SCENARIO_MOUNT.to_string(),
                format!("{}/score.json", RUNNER_OUTPUT_MOUNT),
            ],
            healthcheck: None,
            environment: Vec::new(),
            depends_on: depends_on
                .iter()
                .map(|name| ServiceDependency::healthy(*name))
                .collect(),
            networks: vec![self.options.network.clone()],
        };

        self.config.services.push(service);
        self
    }

    fn agent_healthcheck(&self, port: u16) -> HealthCheck {
        HealthCheck {
            test: vec![
                "CMD".to_string(),
                "python".to_string(),
                "-c".to_string(),
                format!(
                    "import urllib.request; urllib.request.urlopen('http://localhost:{}{}')",
                    port, AGENT_CARD_PATH
                ),
            ],
            interval: self.options.health_interval.clone(),
            timeout: self.options.health_timeout.clone(),
            retries: self.options.health_retries,
            start_period: self.options.health_start_period.clone(),
        }
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Build and return the docker-compose.yml content as a YAML string.
    pub fn build(&self) -> String {
        let mut output = String::new();

        output.push_str("# Auto-generated Docker Compose file from scenario.toml\n");
        output.push_str("# Do not edit manually - regenerate using agentbeats-compose generate\n\n");

        output.push_str(&format!("version: \"{}\"\n\n", self.config.version));

        output.push_str("services:\n");
        for service in &self.config.services {
            output.push_str(&format!("  {}:\n", yaml_scalar(&service.name)));
            output.push_str(&format!("    image: {}\n", yaml_scalar(&service.image)));
            output.push_str(&format!(
                "    container_name: {}\n",
                yaml_scalar(&service.container_name)
            ));

            if !service.volumes.is_empty() {
                output.push_str("    volumes:\n");
                for vol in &service.volumes {
                    output.push_str(&format!("      - {}\n", yaml_scalar(vol)));
                }
            }

            if !service.command.is_empty() {
                output.push_str(&format!(
                    "    command: {}\n",
                    flow_sequence(&service.command)
                ));
            }

            if let Some(ref healthcheck) = service.healthcheck {
                output.push_str("    healthcheck:\n");
                output.push_str(&format!(
                    "      test: {}\n",
                    flow_sequence(&healthcheck.test)
                ));
                output.push_str(&format!("      interval: {}\n", healthcheck.interval));
                output.push_str(&format!("      timeout: {}\n", healthcheck.timeout));
                output.push_str(&format!("      retries: {}\n", healthcheck.retries));
                output.push_str(&format!(
                    "      start_period: {}\n",
                    healthcheck.start_period
                ));
            }

            if !service.environment.is_empty() {
                output.push_str("    environment:\n");
                for entry in &service.environment {
                    output.push_str(&format!("      - {}\n", yaml_scalar(entry)));
                }
            }

            if !service.depends_on.is_empty() {
                output.push_str("    depends_on:\n");
                if service.depends_on.iter().all(|d| d.condition.is_none()) {
                    for dep in &service.depends_on {
                        output.push_str(&format!("      - {}\n", yaml_scalar(&dep.service)));
                    }
                } else {
                    for dep in &service.depends_on {
                        output.push_str(&format!("      {}:\n", yaml_scalar(&dep.service)));
                        let condition = dep.condition.unwrap_or(ServiceCondition::ServiceStarted);
                        output.push_str(&format!("        condition: {}\n", condition));
                    }
                }
            }

            if !service.networks.is_empty() {
                output.push_str("    networks:\n");
                for net in &service.networks {
                    output.push_str(&format!("      - {}\n", yaml_scalar(net)));
                }
            }

            output.push('\n');
        }

        output.push_str("networks:\n");
        for (name, config) in &self.config.networks {
            output.push_str(&format!("  {}:\n", yaml_scalar(name)));
            output.push_str(&format!("    driver: {}\n", yaml_scalar(&config.driver)));
        }

        output
    }
}

impl Default for ComposeBuilder {
    fn default() -> Self {
        Self::new(ComposeOptions::default())
    }
}

/// Renders a string as a YAML scalar, quoting it unless it is plainly safe.
fn yaml_scalar(value: &str) -> String {
    if is_plain_safe(value) {
        value.to_string()
    } else {
        double_quoted(value)
    }
}

/// Renders a flow sequence of double-quoted strings.
fn flow_sequence(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| double_quoted(s)).collect();
    format!("[{}]", quoted.join(", "))
}

// JSON string escaping is a subset of YAML double-quoted escaping.
fn double_quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn is_plain_safe(value: &str) -> bool {
    const YAML_KEYWORDS: [&str; 8] = ["true", "false", "yes", "no", "on", "off", "null", "~"];

    let Some(first) = value.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphanumeric() || first == '.' || first == '/') {
        return false;
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | ':' | '@' | '_' | '-' | '='))
    {
        return false;
    }
    if value.ends_with(':') || value.parse::<f64>().is_ok() {
        return false;
    }
    !YAML_KEYWORDS.contains(&value.to_ascii_lowercase().as_str())
}
