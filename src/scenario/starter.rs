//! Starter scenario written by `agentbeats-compose init`.

/// A minimal scenario with one green agent and one participant.
pub const STARTER_SCENARIO: &str = r#"# AgentBeats scenario
#
# Generate the deployment with:
#   agentbeats-compose generate scenario.toml --output-dir deploy

[green_agent]
image = "ghcr.io/your-org/your-green-agent:latest"
port = 9009

# Variables without a default are secrets and go into .env
[[green_agent.environment]]
name = "OPENAI_API_KEY"

[[green_agent.environment]]
name = "LOG_LEVEL"
default = "info"

[[participants.required_roles]]
name = "agent"
image = "ghcr.io/your-org/your-purple-agent:latest"
port = 9019

[[participants.required_roles.environment]]
name = "OPENAI_API_KEY"

# Any other section is passed to the green agent unchanged
[config]
num_tasks = 3
"#;
