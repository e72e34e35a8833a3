//! Preparation pipeline: extraction, disassembly, and the top-level workflow
//! that sequences them against the cache state.

mod disassemble;
mod error;
mod extract;
mod prepare;

use std::fs;

use tracing::warn;

pub use disassemble::{DisassemblyOutcome, DisassemblyStage};
pub use error::{PipelineError, PipelineResult, Stage};
pub use extract::{ExtractMode, ExtractionStage};
pub use prepare::{prepare_and_disassemble, ExtractionAction, PrepareOptions, PrepareOutcome};

use crate::cache::CacheLayout;
use crate::model::ExecutableRecord;
use crate::tools::{ToolError, ToolOutput};

/// Format flags followed by the executable's base name.
fn analyzer_args(record: &ExecutableRecord) -> Vec<String> {
    let mut args: Vec<String> =
        record.format.analyzer_flags().iter().map(|f| f.to_string()).collect();
    args.push(record.name.clone());
    args
}

fn map_tool_error(stage: Stage, err: ToolError) -> PipelineError {
    match err {
        ToolError::Timeout { seconds } => PipelineError::ToolTimeout { stage, seconds },
        other => PipelineError::ToolUnavailable { stage, reason: other.to_string() },
    }
}

/// Keep a copy of the captured output under `<name>.ch/logs`. Best effort.
fn write_stage_log(layout: &CacheLayout, stage: Stage, output: &ToolOutput) {
    let path = layout.stage_log_path(stage.as_str());
    let body = format!("# {}\n{}\n", output.status_label(), output.combined());
    if let Err(e) = fs::create_dir_all(&layout.logs_dir).and_then(|_| fs::write(&path, body)) {
        warn!(log = %path.display(), error = %e, "failed to write stage log");
    }
}

/// Turn a finished run into an error unless it exited successfully.
fn check_exit(stage: Stage, output: &ToolOutput) -> PipelineResult<()> {
    if output.success() {
        return Ok(());
    }
    Err(PipelineError::ExternalTool {
        stage,
        status: output.status_label(),
        output: output.combined(),
    })
}
