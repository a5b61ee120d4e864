//! `.env.example` generation for scenario secrets.
//!
//! Secrets are never written into docker-compose.yml; compose substitutes them
//! from a `.env` file next to it. The example file lists what has to be filled
//! in and documents the defaults already baked into the compose file.

use crate::scenario::Scenario;

/// Returns true if any agent declares an environment variable.
pub fn has_variables(scenario: &Scenario) -> bool {
    scenario
        .agents()
        .any(|(_, agent)| !agent.environment.is_empty())
}

/// Renders the `.env.example` content for a scenario.
pub fn render_env_example(scenario: &Scenario) -> String {
    let mut lines = vec![
        "# Environment variables for agents".to_string(),
        "# Copy this file to .env and fill in the required values".to_string(),
        String::new(),
    ];

    let secrets = secret_owners(scenario);
    if !secrets.is_empty() {
        lines.push("# Required variables (no defaults)".to_string());
        for (name, services) in secrets {
            lines.push(format!("# {}", services.join(", ")));
            lines.push(format!("{}=", name));
        }
        lines.push(String::new());
    }

    let optional = scenario.optional_variables();
    if !optional.is_empty() {
        lines.push("# Optional variables (defaults are set in docker-compose.yml)".to_string());
        for sv in optional {
            lines.push(format!(
                "# {}: {}={}",
                sv.service,
                sv.var.name,
                sv.var.default_text().unwrap_or_default()
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Required variable names in first-declared order, each with every service
/// that reads it. A `.env` file holds one value per name.
fn secret_owners(scenario: &Scenario) -> Vec<(&str, Vec<&str>)> {
    let mut owners: Vec<(&str, Vec<&str>)> = Vec::new();
    for sv in scenario.required_secrets() {
        let name = sv.var.name.as_str();
        match owners.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, services)) => {
                if !services.contains(&sv.service) {
                    services.push(sv.service);
                }
            }
            None => owners.push((name, vec![sv.service])),
        }
    }
    owners
}
