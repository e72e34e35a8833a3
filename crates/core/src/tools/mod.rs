//! External analyzer seam.
//!
//! Stages talk to the analyzer only through `ToolRunner`, so tests can swap in a
//! fake without a real binary. `ProcessRunner` is the production implementation:
//! it spawns the analyzer, captures its output, and kills it after a bounded wait.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::ToolConfig;

/// Mode in which the analyzer is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Extract,
    ExtractHex,
    Disassemble { xml: bool },
}

impl ToolMode {
    /// Leading command-line flags for this mode.
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            ToolMode::Extract => &["-extract"],
            ToolMode::ExtractHex => &["-extracthex"],
            ToolMode::Disassemble { xml: false } => &["-disassemble"],
            ToolMode::Disassemble { xml: true } => &["-disassemble", "-xml"],
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flags().join(" "))
    }
}

/// Exit status and captured streams of one analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, as shown to the user.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }

    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("analyzer not found; set BINPREP_ANALYZER, the config `analyzer` field, or put chx86_analyze on PATH")]
    NotFound,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("failed to start process runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Narrow interface to the external analyzer.
pub trait ToolRunner: Send + Sync {
    /// Run the analyzer in `mode` with extra `args`, in working directory `cwd`,
    /// blocking until it exits.
    fn run(&self, mode: ToolMode, args: &[String], cwd: &Path) -> Result<ToolOutput, ToolError>;
}

/// Runs the analyzer as a child process with a bounded wait.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    pub fn from_config(config: &ToolConfig) -> Result<Self, ToolError> {
        let program = config.analyzer_path().ok_or(ToolError::NotFound)?;
        Ok(Self::new(program, Duration::from_secs(config.timeout_secs)))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, mode: ToolMode, args: &[String], cwd: &Path) -> Result<ToolOutput, ToolError> {
        debug!(program = %self.program.display(), %mode, ?args, cwd = %cwd.display(), "invoking analyzer");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ToolError::Runtime)?;

        runtime.block_on(async {
            let mut command = tokio::process::Command::new(&self.program);
            command
                .args(mode.flags())
                .args(args)
                .current_dir(cwd)
                .stdin(Stdio::null())
                .kill_on_drop(true);

            match tokio::time::timeout(self.timeout, command.output()).await {
                Ok(Ok(output)) => Ok(ToolOutput::from(output)),
                Ok(Err(source)) => Err(ToolError::Spawn { program: self.program.clone(), source }),
                Err(_) => Err(ToolError::Timeout { seconds: self.timeout.as_secs() }),
            }
        })
    }
}
