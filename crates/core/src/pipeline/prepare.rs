use tracing::{info, warn};

use crate::cache::{CacheLock, CacheManager, CacheManifest, CacheState};
use crate::model::ExecutableRecord;
use crate::pipeline::{
    DisassemblyOutcome, DisassemblyStage, ExtractMode, ExtractionStage, PipelineResult,
};
use crate::tools::{ToolOutput, ToolRunner};

/// Options for `prepare_and_disassemble`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    pub emit_xml: bool,
    /// Remove existing analysis results before disassembling.
    pub reset: bool,
    /// The executable file is hex-encoded.
    pub hex_input: bool,
}

/// What the workflow did to reach `Extracted`.
#[derive(Debug, Clone)]
pub enum ExtractionAction {
    /// The cache was already extracted.
    Skipped,
    /// Standalone content was present and only needed saving.
    Restored,
    /// The extractor ran.
    Extracted(ToolOutput),
}

#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    pub initial_state: CacheState,
    pub reset_performed: bool,
    pub extraction: ExtractionAction,
    pub disassembly: DisassemblyOutcome,
}

/// Top-level control for one executable:
/// lock, optional reset, extract-if-needed, disassemble.
pub fn prepare_and_disassemble(
    runner: &dyn ToolRunner,
    record: &ExecutableRecord,
    options: PrepareOptions,
) -> PipelineResult<PrepareOutcome> {
    let manager = CacheManager::new(record);
    let _lock = CacheLock::acquire(manager.layout())?;

    let initial_state = manager.probe();
    info!(executable = %record.name, format = %record.format, %initial_state, "preparing executable");

    // A changed executable invalidates the cache and the standalone content.
    let stale = initial_state >= CacheState::Extracted
        && CacheManifest::load(manager.layout()).is_some_and(|m| m.is_stale_for(record));
    if stale {
        warn!(executable = %record.name, "executable changed since extraction; rebuilding cache");
        manager.clear()?;
        manager.discard_content()?;
    }

    let reset_performed = if stale {
        true
    } else if options.reset {
        manager.ensure_clean_for_extraction()?;
        true
    } else {
        false
    };

    let extraction_stage = ExtractionStage::new(runner);
    let extraction = if manager.probe() >= CacheState::Extracted {
        ExtractionAction::Skipped
    } else if manager.layout().content_xinfo_path.is_file() {
        extraction_stage.save_extract(record)?;
        ExtractionAction::Restored
    } else {
        let mode = if options.hex_input { ExtractMode::Hex } else { ExtractMode::Normal };
        let output = extraction_stage.extract(record, mode)?;
        extraction_stage.save_extract(record)?;
        ExtractionAction::Extracted(output)
    };

    let disassembly = DisassemblyStage::new(runner).disassemble(record, options.emit_xml)?;

    Ok(PrepareOutcome { initial_state, reset_performed, extraction, disassembly })
}
