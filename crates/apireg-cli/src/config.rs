use std::path::{Path, PathBuf};

use anyhow::Context;
use apireg_engine::RegistryConfig;
use apireg_tasks::PoolConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "apireg.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// JSON snapshot holding the registry between runs.
    pub state_path: PathBuf,
    pub registry: RegistryConfig,
    pub pool: PoolConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("apireg-state.json"),
            registry: RegistryConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load `path`, or `apireg.toml` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&source).with_context(|| format!("parsing config {}", path.display()))
    }
}
