//! Path resolution: user filename + declared format -> `ExecutableRecord`.

use std::env;
use std::path::{Path, PathBuf};

use goblin::Object;
use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::model::{ExecutableFormat, ExecutableRecord};
use crate::pipeline::{PipelineError, PipelineResult};

/// Resolves user-supplied filenames against the tool configuration.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    config: &'a ToolConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a ToolConfig) -> Self {
        Self { config }
    }

    /// Resolve `filename` to a canonical (dir, basename) pair and validate that
    /// the executable and its configured dependencies exist. No side effects.
    pub fn resolve(&self, filename: &str, format: ExecutableFormat) -> PipelineResult<ExecutableRecord> {
        let input = Path::new(filename);
        let absolute = if input.is_absolute() {
            input.to_path_buf()
        } else {
            let cwd = env::current_dir().map_err(|e| PipelineError::io(".", e))?;
            cwd.join(input)
        };

        if !absolute.is_file() {
            return Err(PipelineError::ExecutableNotFound(absolute));
        }
        let canonical = absolute.canonicalize().map_err(|e| PipelineError::io(&absolute, e))?;
        let (dir, name) = split_path(&canonical)
            .ok_or_else(|| PipelineError::ExecutableNotFound(canonical.clone()))?;

        let dependencies = self.config.dependencies_for(&name).to_vec();
        for dep in &dependencies {
            let dep_path = if Path::new(dep).is_absolute() { PathBuf::from(dep) } else { dir.join(dep) };
            if !dep_path.is_file() {
                return Err(PipelineError::MissingDependency {
                    executable: name.clone(),
                    format: format.to_string(),
                    dependency: dep.clone(),
                    path: dep_path,
                });
            }
        }

        warn_on_format_mismatch(&canonical, format);

        debug!(dir = %dir.display(), %name, %format, ?dependencies, "resolved executable");
        Ok(ExecutableRecord { dir, name, format, dependencies })
    }
}

fn split_path(path: &Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_str()?.to_string();
    let dir = path.parent()?.to_path_buf();
    Some((dir, name))
}

/// Container format detected from the file header, if any.
fn sniff_format(bytes: &[u8]) -> Option<&'static str> {
    match Object::parse(bytes).ok()? {
        Object::PE(_) => Some("pe"),
        Object::Elf(_) => Some("elf"),
        _ => None,
    }
}

fn warn_on_format_mismatch(path: &Path, declared: ExecutableFormat) {
    let Ok(bytes) = std::fs::read(path) else {
        return;
    };
    let expected = match declared {
        ExecutableFormat::X86Pe => "pe",
        ExecutableFormat::MipsElf => "elf",
    };
    match sniff_format(&bytes) {
        Some(found) if found != expected => {
            warn!(path = %path.display(), %declared, found, "declared format does not match file header");
        }
        _ => {}
    }
}
