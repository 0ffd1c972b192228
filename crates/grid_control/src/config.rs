use std::path::{Path, PathBuf};

use anyhow::Context;
use grid_core::DEFAULT_YEAR;
use serde::{Deserialize, Serialize};

use crate::kernel::KernelConfig;

pub const DEFAULT_STATE_FILE: &str = "static/data/bengaluru_area_temperatures.json";

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_year() -> String {
    DEFAULT_YEAR.to_string()
}

/// Launch settings for the three external kernels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelsConfig {
    pub diffusion: KernelConfig,
    pub capture: KernelConfig,
    pub workflow: KernelConfig,
}

impl Default for KernelsConfig {
    fn default() -> Self {
        Self {
            diffusion: KernelConfig::new("node", &["dispersionModel.js"]),
            capture: KernelConfig::new("node", &["captureSimulation.js"]),
            workflow: KernelConfig::new("node", &["dashboard.js"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Year used when a request names none and the store is empty.
    #[serde(default = "default_year")]
    pub default_year: String,
    /// Seeds emission generation. Absent: seeded from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub kernels: KernelsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            default_year: default_year(),
            seed: None,
            kernels: KernelsConfig::default(),
        }
    }
}

/// Read a JSON config file, or the built-in defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    grid_core::validate_year(&config.default_year)
        .with_context(|| format!("invalid default_year in {}", path.display()))?;
    Ok(config)
}
