use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BgError;

pub const CONFIG_FILE_NAME: &str = "batch-golem.toml";
pub const STATE_FILE_NAME: &str = "queue-state.json";

#[derive(Default, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BatchGolemConfig {
    pub project: ProjectConfig,
    pub execution: ExecutionConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Batch plan file, relative to the project root.
    pub plan_path: String,
    /// Directory for the lock file and the persisted queue state.
    pub runtime_dir: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Pick up a persisted snapshot instead of starting over.
    pub resume: bool,
    /// Simulated run time of each item in a dry run.
    pub dry_run_delay_ms: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            plan_path: "BATCH.yaml".to_string(),
            runtime_dir: ".batch-golem".to_string(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            resume: true,
            dry_run_delay_ms: 0,
        }
    }
}

impl BatchGolemConfig {
    pub fn plan_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project.plan_path)
    }

    pub fn runtime_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.runtime_dir)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        self.runtime_dir(root).join(STATE_FILE_NAME)
    }
}

pub fn validate(config: &BatchGolemConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.project.plan_path.trim().is_empty() {
        errors.push("project.plan_path must not be empty".to_string());
    }

    if config.project.runtime_dir.trim().is_empty() {
        errors.push("project.runtime_dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Load `batch-golem.toml` from the project root, falling back to defaults
/// when the file does not exist.
pub fn load_config(project_root: &Path) -> Result<BatchGolemConfig, BgError> {
    let config_path = project_root.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        return Ok(BatchGolemConfig::default());
    }

    let contents =
        std::fs::read_to_string(&config_path).map_err(|e| BgError::read(&config_path, e))?;

    let config: BatchGolemConfig =
        toml::from_str(&contents).map_err(|e| BgError::parse(&config_path, e))?;

    validate(&config).map_err(BgError::InvalidConfig)?;

    Ok(config)
}
