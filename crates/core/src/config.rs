use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "BINPREP_CONFIG";

/// Environment variable overriding the analyzer executable path.
pub const ANALYZER_ENV: &str = "BINPREP_ANALYZER";

/// Analyzer looked up on `PATH` when nothing else is configured.
pub const DEFAULT_ANALYZER: &str = "chx86_analyze";

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Per-executable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Auxiliary files that must exist next to the executable.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Serializable tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the external analyzer executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Upper bound on a single analyzer invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Settings keyed by executable base filename.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self { analyzer: None, timeout_secs: DEFAULT_TIMEOUT_SECS, targets: BTreeMap::new() }
    }
}

impl ToolConfig {
    /// Declared dependencies for an executable, empty when none are configured.
    pub fn dependencies_for(&self, name: &str) -> &[String] {
        self.targets.get(name).map(|t| t.dependencies.as_slice()).unwrap_or(&[])
    }

    /// Resolve the analyzer path: env override, then config, then `PATH`.
    pub fn analyzer_path(&self) -> Option<PathBuf> {
        if let Some(p) = std::env::var_os(ANALYZER_ENV) {
            return Some(PathBuf::from(p));
        }
        if let Some(p) = &self.analyzer {
            return Some(PathBuf::from(p));
        }
        which::which(DEFAULT_ANALYZER).ok()
    }
}

/// Load the tool config from an explicit path, the `BINPREP_CONFIG`
/// environment variable, or fall back to defaults.
pub fn load_tool_config(path: Option<&Path>) -> Result<ToolConfig> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    };
    let Some(path) = path else {
        return Ok(ToolConfig::default());
    };

    let body = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read tool config at {}", path.display()))?;
    let config: ToolConfig =
        serde_json::from_str(&body).context("Failed to parse tool config JSON")?;
    Ok(config)
}
