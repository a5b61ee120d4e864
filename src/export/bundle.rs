//! Rendering and writing the files of a scenario deployment.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::docker::{has_variables, render_env_example, ComposeBuilder, ComposeOptions};
use crate::error::ExportError;
use crate::runner::{render_runner_scenario, RUNNER_SCENARIO_FILE};
use crate::scenario::Scenario;

/// File name of the generated compose file.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// File name of the generated environment example.
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

/// Directory the runner writes its results into.
pub const OUTPUT_DIR: &str = "output";

/// Rendered deployment files for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioBundle {
    /// docker-compose.yml content.
    pub compose: String,
    /// runner-scenario.toml content.
    pub runner_scenario: String,
    /// .env.example content, absent when no agent declares variables.
    pub env_example: Option<String>,
}

impl ScenarioBundle {
    /// Renders every file for the scenario.
    pub fn from_scenario(
        scenario: &Scenario,
        options: &ComposeOptions,
    ) -> Result<Self, ExportError> {
        let compose = ComposeBuilder::from_scenario(scenario, options).build();
        let runner_scenario = render_runner_scenario(scenario)?;
        let env_example = has_variables(scenario).then(|| render_env_example(scenario));

        debug!(
            compose_bytes = compose.len(),
            runner_bytes = runner_scenario.len(),
            env_example = env_example.is_some(),
            "Rendered scenario bundle"
        );

        Ok(Self {
            compose,
            runner_scenario,
            env_example,
        })
    }

    /// Writes the bundle into `dir` and returns the written file paths.
    ///
    /// The directory is created if needed, along with the `output/` directory the
    /// runner mounts, so that Docker does not create it owned by root.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        create_dir(dir)?;
        create_dir(&dir.join(OUTPUT_DIR))?;

        let mut written = Vec::with_capacity(3);

        let compose_path = dir.join(COMPOSE_FILE);
        write_file(&compose_path, &self.compose)?;
        written.push(compose_path);

        let runner_path = dir.join(RUNNER_SCENARIO_FILE);
        write_file(&runner_path, &self.runner_scenario)?;
        written.push(runner_path);

        if let Some(ref env_example) = self.env_example {
            let env_path = dir.join(ENV_EXAMPLE_FILE);
            write_file(&env_path, env_example)?;
            written.push(env_path);
        }

        Ok(written)
    }
}

fn create_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path).map_err(|source| ExportError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    info!("Writing {}", path.display());
    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
