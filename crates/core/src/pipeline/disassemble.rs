use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::cache::{probe, CacheManifest, CacheState};
use crate::model::ExecutableRecord;
use crate::pipeline::{
    analyzer_args, check_exit, map_tool_error, write_stage_log, PipelineError, PipelineResult,
    Stage,
};
use crate::tools::{ToolMode, ToolOutput, ToolRunner};

/// Artifacts and captured output of a successful disassembly.
#[derive(Debug, Clone)]
pub struct DisassemblyOutcome {
    pub output: ToolOutput,
    pub asm_log: PathBuf,
    pub orphan_log: PathBuf,
    pub status_xml: Option<PathBuf>,
    pub state: CacheState,
}

/// Runs the analyzer in disassembly-only mode.
pub struct DisassemblyStage<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> DisassemblyStage<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Requires the cache to be at least `Extracted`. Existing logs are
    /// overwritten by the analyzer.
    pub fn disassemble(
        &self,
        record: &ExecutableRecord,
        emit_xml: bool,
    ) -> PipelineResult<DisassemblyOutcome> {
        let layout = record.layout();
        let found = probe(&layout);
        if found < CacheState::Extracted {
            return Err(PipelineError::NotReady {
                stage: Stage::Disassembly,
                found,
                required: CacheState::Extracted,
            });
        }

        fs::create_dir_all(&layout.analysis_dir)
            .map_err(|e| PipelineError::io(&layout.analysis_dir, e))?;

        info!(executable = %record.name, emit_xml, "disassembling executable");
        let output = self
            .runner
            .run(ToolMode::Disassemble { xml: emit_xml }, &analyzer_args(record), &record.dir)
            .map_err(|e| map_tool_error(Stage::Disassembly, e))?;
        write_stage_log(&layout, Stage::Disassembly, &output);
        check_exit(Stage::Disassembly, &output)?;

        let mut expected = vec![&layout.asm_log_path, &layout.orphan_log_path];
        if emit_xml {
            expected.push(&layout.status_xml_path);
        }
        if let Some(missing) = expected.into_iter().find(|p| !p.is_file()) {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Disassembly,
                path: missing.clone(),
            });
        }

        match CacheManifest::load(&layout) {
            Some(mut manifest) => {
                manifest.mark_disassembled();
                manifest.save(&layout)?;
            }
            None => warn!(executable = %record.name, "no cache manifest to update"),
        }

        let state = probe(&layout);
        info!(executable = %record.name, %state, "disassembly finished");
        Ok(DisassemblyOutcome {
            output,
            asm_log: layout.asm_log_path.clone(),
            orphan_log: layout.orphan_log_path.clone(),
            status_xml: emit_xml.then(|| layout.status_xml_path.clone()),
            state,
        })
    }
}
