use std::fs;

use tracing::info;

use crate::cache::{archive, probe, CacheManifest, CacheState};
use crate::model::ExecutableRecord;
use crate::pipeline::{
    analyzer_args, check_exit, map_tool_error, write_stage_log, PipelineError, PipelineResult,
    Stage,
};
use crate::tools::{ToolMode, ToolOutput, ToolRunner};
use crate::util::copy_dir_all;

/// How the executable on disk is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    #[default]
    Normal,
    /// The file holds the executable as hex text.
    Hex,
}

impl ExtractMode {
    fn tool_mode(self) -> ToolMode {
        match self {
            ExtractMode::Normal => ToolMode::Extract,
            ExtractMode::Hex => ToolMode::ExtractHex,
        }
    }
}

/// Converts the executable into the analyzer's intermediate representation.
pub struct ExtractionStage<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> ExtractionStage<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Run the extractor. On success the standalone content directory exists,
    /// but the cache is not advanced until `save_extract` is called.
    pub fn extract(&self, record: &ExecutableRecord, mode: ExtractMode) -> PipelineResult<ToolOutput> {
        let layout = record.layout();
        info!(executable = %record.name, ?mode, "extracting executable");

        let output = self
            .runner
            .run(mode.tool_mode(), &analyzer_args(record), &record.dir)
            .map_err(|e| map_tool_error(Stage::Extraction, e))?;
        write_stage_log(&layout, Stage::Extraction, &output);
        check_exit(Stage::Extraction, &output)?;

        if !layout.content_xinfo_path.is_file() {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Extraction,
                path: layout.content_xinfo_path,
            });
        }
        Ok(output)
    }

    /// Persist the standalone content: pack it into the archive sibling, copy
    /// it into the cache, and write the manifest. Advances the cache to `Extracted`.
    pub fn save_extract(&self, record: &ExecutableRecord) -> PipelineResult<CacheState> {
        let layout = record.layout();
        if !layout.content_xinfo_path.is_file() {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Extraction,
                path: layout.content_xinfo_path,
            });
        }

        archive::pack_content(&layout)?;

        if layout.extract_dir.exists() {
            fs::remove_dir_all(&layout.extract_dir)
                .map_err(|e| PipelineError::io(&layout.extract_dir, e))?;
        }
        copy_dir_all(&layout.content_dir, &layout.extract_dir)
            .map_err(|e| PipelineError::io(&layout.extract_dir, e))?;

        CacheManifest::for_extraction(record)?.save(&layout)?;

        let state = probe(&layout);
        info!(executable = %record.name, %state, "saved extraction");
        Ok(state)
    }
}
