//! Advisor configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file
//! named by `ADVISOR_CONFIG`, then `ADVISOR_*` environment variables. Nested
//! keys use a double underscore, e.g. `ADVISOR_TRAINER__N_ESTIMATORS=50`.

use advisor_lib::TrainerConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "ADVISOR_CONFIG";

/// Advisor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Name attached to every structured log event
    pub instance_name: String,

    pub bind_address: String,

    pub port: u16,

    pub range_artifact_path: PathBuf,

    pub maintenance_artifact_path: PathBuf,

    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,

    /// Settings for fallback training
    pub trainer: TrainerConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            bind_address: "0.0.0.0".to_string(),
            port: 5001,
            range_artifact_path: PathBuf::from("artifacts/ev_range_model.bin"),
            maintenance_artifact_path: PathBuf::from("artifacts/maintenance_model.bin"),
            cors_origins: vec!["http://localhost:3000".to_string()],
            trainer: TrainerConfig::default(),
        }
    }
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "vehicle-advisor".to_string())
}

impl AdvisorConfig {
    /// Load configuration from the optional file and the process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        Self::from_sources(file.as_deref(), environment())
    }

    /// Build from an optional file and an environment source
    pub fn from_sources(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(env)
            .build()
            .context("Failed to read advisor configuration")?;
        settings
            .try_deserialize()
            .context("Invalid advisor configuration")
    }

    /// `bind_address:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// `ADVISOR_*` variables with `__` for nesting and comma-separated origins
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("ADVISOR")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_origins")
}
