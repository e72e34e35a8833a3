use std::path::Path;

use anyhow::{Context, Result};
use binprep_core::config::{load_tool_config, ToolConfig};
use binprep_core::model::{ExecutableFormat, ExecutableRecord};
use binprep_core::paths::PathResolver;

/// Load the tool config (explicit path, `BINPREP_CONFIG`, or defaults).
pub fn load_config(config_path: Option<&Path>) -> Result<ToolConfig> {
    load_tool_config(config_path)
}

/// Parse the format tag and resolve `file` into an executable record.
pub fn resolve_executable(config: &ToolConfig, file: &str, format: &str) -> Result<ExecutableRecord> {
    let format: ExecutableFormat =
        format.parse().map_err(binprep_core::pipeline::PipelineError::from)?;
    let record = PathResolver::new(config).resolve(file, format)?;
    Ok(record)
}

/// Serialize `value` as pretty JSON and print it.
pub fn print_json<T: serde::Serialize>(value: &T, what: &str) -> Result<()> {
    let serialized =
        serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {what} to JSON"))?;
    println!("{}", serialized);
    Ok(())
}

/// Helper to print whether a path exists.
pub fn print_path_status(label: &str, path: &Path) {
    let exists = path.exists();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
