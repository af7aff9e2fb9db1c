use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use intent_router::defaults::DEFAULT_POLICY_RELATIVE_PATH;

use crate::cli::LogFormat;

/// File name of the configuration file under the installation root.
pub const DEFAULT_CONFIG_FILE: &str = "route-intent.yaml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Policy document; falls back to the installation-root default.
    #[serde(default)]
    pub policy_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// The installation root: the parent of the directory holding the
/// executable, or the current directory when that cannot be determined.
pub fn install_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}

pub fn default_policy_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_POLICY_RELATIVE_PATH)
}

/// Pick the policy path: explicit flag, then config file, then the default
/// location under `root`.
pub fn resolve_policy_path(flag: Option<&Path>, config: &Config, root: &Path) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.policy_file.clone())
        .unwrap_or_else(|| default_policy_path(root))
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    // An empty file deserializes as unit, not as an empty mapping.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    Ok(config)
}
