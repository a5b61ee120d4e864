//! Export of generated deployment files.
//!
//! Renders everything a scenario needs into a [`ScenarioBundle`] and writes it
//! next to where `docker compose up` will be run.

pub mod bundle;

pub use bundle::{ScenarioBundle, COMPOSE_FILE, ENV_EXAMPLE_FILE, OUTPUT_DIR};
