use anyhow::{Context, Result};
use chatmap_graph::{FocusConfig, ProjectionConfig};
use chatmap_store::{DataLayout, CONFIG_FILE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "CHATMAP_DATA_DIR";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Ingestion command run by `refresh`, as argv
    pub refresh_command: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            refresh_command: Vec::new(),
        }
    }
}

/// Contents of `chatmap.toml`. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatmapConfig {
    pub data: DataLayout,
    pub view: ProjectionConfig,
    pub focus: FocusConfig,
    pub server: ServerConfig,
}

impl ChatmapConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid chatmap config")
    }

    /// Read a config file; a relative `data.dir` is taken relative to the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config =
            Self::from_toml(&raw).with_context(|| format!("In {}", path.display()))?;
        if config.data.dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data.dir = parent.join(&config.data.dir);
            }
        }
        Ok(config)
    }

    /// Defaults, then the config file, then `CHATMAP_DATA_DIR`, then flags.
    pub fn resolve(config_file: Option<&Path>, data_dir_flag: Option<&Path>) -> Result<Self> {
        let env_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve_with(config_file, env_dir.as_deref(), data_dir_flag)
    }

    fn resolve_with(
        config_file: Option<&Path>,
        env_dir: Option<&Path>,
        data_dir_flag: Option<&Path>,
    ) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => {
                let probe_dir = data_dir_flag.or(env_dir).unwrap_or(Path::new("."));
                let candidate = probe_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    log::debug!("Using config {}", candidate.display());
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(dir) = env_dir {
            config.data.dir = dir.to_path_buf();
        }
        if let Some(dir) = data_dir_flag {
            config.data.dir = dir.to_path_buf();
        }
        Ok(config)
    }
}
