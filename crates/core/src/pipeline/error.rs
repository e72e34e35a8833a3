use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheState;
use crate::results::ResultsError;

/// Pipeline stage that invoked the external analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Disassembly,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Disassembly => "disassembly",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for path resolution, cache management, and pipeline stages.
///
/// Every variant is terminal for the current invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("path resolution failed: executable not found at {0}")]
    ExecutableNotFound(PathBuf),

    #[error("path resolution failed: {0}")]
    UnknownFormat(#[from] crate::model::UnknownFormat),

    #[error("unsupported dependency: {format} executable {executable} requires {dependency}, not found at {path}")]
    MissingDependency { executable: String, format: String, dependency: String, path: PathBuf },

    #[error("archive error: {reason} ({path})")]
    Archive { path: PathBuf, reason: String },

    /// The analyzer exited unsuccessfully; `output` is its captured text, verbatim.
    #[error("external tool failed during {stage} ({status}):\n{output}")]
    ExternalTool { stage: Stage, status: String, output: String },

    #[error("external tool failed during {stage}: expected artifact {path} was not produced")]
    MissingArtifact { stage: Stage, path: PathBuf },

    #[error("external tool timed out during {stage} after {seconds}s")]
    ToolTimeout { stage: Stage, seconds: u64 },

    #[error("external tool could not be started during {stage}: {reason}")]
    ToolUnavailable { stage: Stage, reason: String },

    #[error("cannot run {stage}: cache is {found}, requires at least {required}")]
    NotReady { stage: Stage, found: CacheState, required: CacheState },

    #[error("analysis results not found at {0}; prepare and analyze the executable first")]
    AnalysisNotFound(PathBuf),

    #[error("cache is locked by another invocation ({0})")]
    CacheLocked(PathBuf),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io { path: path.into(), source }
    }
}

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
