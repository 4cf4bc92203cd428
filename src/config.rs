use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
}

/// Input and output locations, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Prompt batch (JSONL) written by prompt generation
    #[serde(default = "default_prompts_path")]
    pub prompts: PathBuf,

    /// Labeler roster (YAML)
    #[serde(default = "default_labelers_path")]
    pub labelers: PathBuf,

    /// Minutes per prompt type (YAML)
    #[serde(default = "default_time_model_path")]
    pub time_model: PathBuf,

    /// Where the allocation plan is written
    #[serde(default = "default_out_path")]
    pub out: PathBuf,
}

fn default_prompts_path() -> PathBuf {
    PathBuf::from("data/prompts/prompts.jsonl")
}

fn default_labelers_path() -> PathBuf {
    PathBuf::from("config/labelers.yml")
}

fn default_time_model_path() -> PathBuf {
    PathBuf::from("config/time_model.yml")
}

fn default_out_path() -> PathBuf {
    PathBuf::from("data/allocations/plan.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts: default_prompts_path(),
            labelers: default_labelers_path(),
            time_model: default_time_model_path(),
            out: default_out_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Upper bound on repair moves (default: one per item in the batch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_repair_moves: Option<usize>,
}

impl Config {
    /// Load from an explicit file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("label-allocator").join("config.toml"))
    }
}
