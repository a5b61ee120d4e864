//! CLI command definitions for agentbeats-compose.
//!
//! This module provides the command-line interface for turning a scenario
//! file into a runnable Docker Compose deployment and for checking on an
//! evaluation once it is running.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::docker::{ComposeOptions, DEFAULT_NETWORK, DEFAULT_RUNNER_IMAGE};
use crate::export::{ScenarioBundle, ENV_EXAMPLE_FILE};
use crate::runner::{
    wait_for_all, EvaluationResult, HealthProbeConfig, RunnerScenario, RUNNER_SCENARIO_FILE,
};
use crate::scenario::{Scenario, STARTER_SCENARIO};

/// Default scenario file name.
const DEFAULT_SCENARIO_FILE: &str = "scenario.toml";

/// AgentBeats scenario tooling.
#[derive(Parser)]
#[command(name = "agentbeats-compose")]
#[command(about = "Generate Docker Compose deployments for AgentBeats agent evaluations")]
#[command(version)]
#[command(
    long_about = "agentbeats-compose reads a scenario.toml describing a green agent and its participant agents and generates docker-compose.yml, runner-scenario.toml and .env.example.\n\nExample usage:\n  agentbeats-compose generate scenario.toml --output-dir deploy\n  cd deploy && docker compose up --abort-on-container-exit\n  agentbeats-compose result deploy/output/score.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate docker-compose.yml, runner-scenario.toml and .env.example.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Check a scenario file without writing anything.
    Validate(ValidateArgs),

    /// Write a starter scenario.toml.
    Init(InitArgs),

    /// Wait until every agent serves its agent card.
    Wait(WaitArgs),

    /// Inspect the score.json written by the runner.
    Result(ResultArgs),
}

/// Arguments for `agentbeats-compose generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the scenario.toml file.
    pub scenario: PathBuf,

    /// Directory to write output files (default: current directory).
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Image for the evaluation runner service.
    #[arg(long, env = "AGENTBEATS_RUNNER_IMAGE", default_value = DEFAULT_RUNNER_IMAGE)]
    pub runner_image: String,

    /// Name of the shared Docker network.
    #[arg(long, default_value = DEFAULT_NETWORK)]
    pub network: String,
}

/// Arguments for `agentbeats-compose validate`.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the scenario.toml file.
    #[arg(default_value = DEFAULT_SCENARIO_FILE)]
    pub scenario: PathBuf,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `agentbeats-compose init`.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the starter scenario.
    #[arg(short = 'o', long, default_value = DEFAULT_SCENARIO_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `agentbeats-compose wait`.
#[derive(Parser, Debug)]
pub struct WaitArgs {
    /// Runner scenario listing the agent endpoints.
    #[arg(short = 's', long, conflicts_with = "endpoint")]
    pub scenario: Option<PathBuf>,

    /// Agent endpoint to probe (repeatable), e.g. http://green-agent:9009.
    #[arg(short = 'e', long)]
    pub endpoint: Vec<String>,

    /// Give up after this many seconds.
    #[arg(long, default_value = "180")]
    pub timeout: u64,

    /// Seconds between attempts.
    #[arg(long, default_value = "2")]
    pub interval: u64,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `agentbeats-compose result`.
#[derive(Parser, Debug)]
pub struct ResultArgs {
    /// Path to score.json.
    #[arg(default_value = "output/score.json")]
    pub path: PathBuf,

    /// Fail unless the score is at least this value.
    #[arg(long, value_parser = parse_min_score)]
    pub min_score: Option<f64>,

    /// Print the result as JSON.
    #[arg(short = 'j', long, conflicts_with = "markdown")]
    pub json: bool,

    /// Print a Markdown summary for a result submission pull request.
    #[arg(short = 'm', long)]
    pub markdown: bool,
}

fn parse_min_score(value: &str) -> Result<f64, String> {
    let min: f64 = value
        .parse()
        .map_err(|e| format!("invalid number '{}': {}", value, e))?;
    if !min.is_finite() {
        return Err(format!("'{}' is not a finite number", value));
    }
    Ok(min)
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args),
        Commands::Validate(args) => run_validate_command(args),
        Commands::Init(args) => run_init_command(args),
        Commands::Wait(args) => run_wait_command(args).await,
        Commands::Result(args) => run_result_command(args),
    }
}

// ============================================================================
// Generate
// ============================================================================

fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    info!("Reading configuration from {}", args.scenario.display());
    let scenario = Scenario::from_path(&args.scenario)
        .with_context(|| format!("Invalid scenario '{}'", args.scenario.display()))?;

    let options = ComposeOptions::default()
        .with_runner_image(args.runner_image)
        .with_network(args.network);
    let bundle = ScenarioBundle::from_scenario(&scenario, &options)?;
    let written = bundle
        .write_to(&args.output_dir)
        .context("Failed to write generated files")?;

    println!("\nSuccess! Generated files:");
    for path in &written {
        println!("  - {}", path.display());
    }

    println!("\nNext steps:");
    println!("  1. Review the generated docker-compose.yml");
    if bundle.env_example.is_some() {
        println!(
            "  2. Copy {} to .env and fill in required values",
            ENV_EXAMPLE_FILE
        );
        println!("  3. Run: docker compose up --abort-on-container-exit");
    } else {
        println!("  2. Run: docker compose up --abort-on-container-exit");
    }

    Ok(())
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Debug, Serialize)]
struct ServiceSummary {
    name: String,
    image: String,
    port: u16,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    status: String,
    services: Vec<ServiceSummary>,
    required_secrets: Vec<String>,
    optional_variables: Vec<String>,
    extra_sections: Vec<String>,
}

fn summarize(scenario: &Scenario) -> ValidateOutput {
    // Agents may share a secret; compose substitutes it from a single .env entry.
    let mut seen = HashSet::new();
    let required_secrets: Vec<String> = scenario
        .required_secrets()
        .iter()
        .map(|sv| sv.var.name.clone())
        .filter(|name| seen.insert(name.clone()))
        .collect();

    ValidateOutput {
        status: "valid".to_string(),
        services: scenario
            .agents()
            .map(|(name, agent)| ServiceSummary {
                name: name.to_string(),
                image: agent.image.clone(),
                port: agent.port,
            })
            .collect(),
        required_secrets,
        optional_variables: scenario
            .optional_variables()
            .iter()
            .map(|sv| format!("{}={}", sv.var.name, sv.var.default_text().unwrap_or_default()))
            .collect(),
        extra_sections: scenario.extra_sections.keys().cloned().collect(),
    }
}

fn run_validate_command(args: ValidateArgs) -> anyhow::Result<()> {
    let scenario = Scenario::from_path(&args.scenario)
        .with_context(|| format!("Invalid scenario '{}'", args.scenario.display()))?;
    let summary = summarize(&scenario);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Scenario {} is valid", args.scenario.display());
    println!("\nServices:");
    for service in &summary.services {
        println!("  {:<24} {} (port {})", service.name, service.image, service.port);
    }
    if !summary.required_secrets.is_empty() {
        println!("\nRequired secrets: {}", summary.required_secrets.join(", "));
    }
    if !summary.optional_variables.is_empty() {
        println!("Defaults:         {}", summary.optional_variables.join(", "));
    }
    if !summary.extra_sections.is_empty() {
        println!("Extra sections:   {}", summary.extra_sections.join(", "));
    }
    Ok(())
}

// ============================================================================
// Init
// ============================================================================

fn run_init_command(args: InitArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            args.output.display()
        );
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&args.output, STARTER_SCENARIO)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Wrote starter scenario to {}", args.output.display());
    println!(
        "Edit the images and ports, then run: agentbeats-compose generate {}",
        args.output.display()
    );
    Ok(())
}

// ============================================================================
// Wait
// ============================================================================

fn wait_endpoints(args: &WaitArgs) -> anyhow::Result<Vec<String>> {
    if !args.endpoint.is_empty() {
        return Ok(args.endpoint.clone());
    }
    let path = args
        .scenario
        .clone()
        .unwrap_or_else(|| PathBuf::from(RUNNER_SCENARIO_FILE));
    let runner = RunnerScenario::from_path(&path)
        .with_context(|| format!("Failed to load runner scenario '{}'", path.display()))?;
    Ok(runner.endpoints())
}

async fn run_wait_command(args: WaitArgs) -> anyhow::Result<()> {
    let endpoints = wait_endpoints(&args)?;
    let config = HealthProbeConfig::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_interval(Duration::from_secs(args.interval));

    let results = wait_for_all(&endpoints, &config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("\n=== Agents Ready ===");
        for health in &results {
            println!(
                "  {:<32} {} (after {} attempt(s), {:.1}s)",
                health.endpoint,
                health.card.name.as_deref().unwrap_or("unnamed agent"),
                health.attempts,
                health.elapsed.as_secs_f64()
            );
        }
    }
    Ok(())
}

// ============================================================================
// Result
// ============================================================================

fn run_result_command(args: ResultArgs) -> anyhow::Result<()> {
    let result = load_result(&args.path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.markdown {
        print!("{}", result.to_markdown());
    } else {
        println!("\n=== Evaluation Result ===");
        println!("Status: {}", result.status);
        match result.score {
            Some(score) => println!("Score:  {}", score),
            None => println!("Score:  n/a"),
        }
        if let Some(ref reasoning) = result.reasoning {
            println!("\n{}", reasoning.trim());
        }
    }

    result.check(args.min_score)?;
    Ok(())
}

fn load_result(path: &Path) -> anyhow::Result<EvaluationResult> {
    EvaluationResult::from_path(path)
        .with_context(|| format!("Failed to load evaluation result '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_args() {
        let cli = Cli::try_parse_from([
            "agentbeats-compose",
            "generate",
            "scenario.toml",
            "--output-dir",
            "deploy",
            "--runner-image",
            "example.org/runner:v1",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.scenario, PathBuf::from("scenario.toml"));
                assert_eq!(args.output_dir, PathBuf::from("deploy"));
                assert_eq!(args.runner_image, "example.org/runner:v1");
                assert_eq!(args.network, DEFAULT_NETWORK);
            }
            _ => panic!("expected generate"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_wait_rejects_scenario_and_endpoint_together() {
        let parsed = Cli::try_parse_from([
            "agentbeats-compose",
            "wait",
            "--scenario",
            "runner-scenario.toml",
            "--endpoint",
            "http://green-agent:9009",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_result_min_score_must_be_finite() {
        for value in ["NaN", "inf", "-inf", "high"] {
            let parsed =
                Cli::try_parse_from(["agentbeats-compose", "result", "--min-score", value]);
            assert!(parsed.is_err(), "--min-score {value} should be rejected");
        }

        let cli =
            Cli::try_parse_from(["agentbeats-compose", "result", "--min-score", "0.5"]).unwrap();
        match cli.command {
            Commands::Result(args) => assert_eq!(args.min_score, Some(0.5)),
            _ => panic!("expected result"),
        }
    }

    #[test]
    fn test_wait_endpoints_prefers_explicit_list() {
        let args = WaitArgs {
            scenario: None,
            endpoint: vec!["http://a:1".to_string(), "http://b:2".to_string()],
            timeout: 1,
            interval: 1,
            json: false,
        };
        assert_eq!(wait_endpoints(&args).unwrap(), args.endpoint);
    }

    #[test]
    fn test_summarize_scenario() {
        let scenario = Scenario::from_toml_str(STARTER_SCENARIO).unwrap();
        let summary = summarize(&scenario);
        assert_eq!(summary.services.len(), 2);
        assert_eq!(summary.services[0].name, "green-agent");
        assert_eq!(summary.required_secrets, vec!["OPENAI_API_KEY"]);
        assert_eq!(summary.optional_variables, vec!["LOG_LEVEL=info"]);
        assert_eq!(summary.extra_sections, vec!["config"]);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("scenario.toml");
        fs::write(&output, "existing").unwrap();

        let err = run_init_command(InitArgs {
            output: output.clone(),
            force: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "existing");

        run_init_command(InitArgs {
            output: output.clone(),
            force: true,
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), STARTER_SCENARIO);
    }
}
