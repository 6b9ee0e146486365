use carepilot_agent::ModelConfig;
use carepilot_orchestrator::{OrchestratorConfig, SchedulerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `[model].api_key` is empty.
pub const API_KEY_ENV: &str = "CAREPILOT_API_KEY";

/// Contents of `carepilot.toml`.
#[derive(Debug, Deserialize)]
pub struct CarePilotConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl CarePilotConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        if config.model.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.model.api_key = key;
            }
        }
        Ok(config)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {e}", path.display())
        })?;
        Self::parse(&raw)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.data_dir.join("tasks")
    }

    pub fn collaborations_dir(&self) -> PathBuf {
        self.data_dir.join("collaborations")
    }
}
