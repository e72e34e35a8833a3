use std::path::Path;

use anyhow::Result;
use binprep_core::model::ExecutableRecord;
use binprep_core::pipeline::{
    prepare_and_disassemble, ExtractionAction, PrepareOptions, PrepareOutcome,
};
use binprep_core::tools::{ProcessRunner, ToolRunner};
use tracing::info;

use crate::commands::util::{load_config, resolve_executable};

/// Prepare `file` (extract if needed) and disassemble it.
///
/// The path is resolved before the analyzer is looked up, so a missing file
/// fails without touching any external process.
pub fn disassemble_command(
    config_path: Option<&Path>,
    file: &str,
    format: &str,
    options: PrepareOptions,
) -> Result<()> {
    let config = load_config(config_path)?;
    let record = resolve_executable(&config, file, format)?;
    let runner = ProcessRunner::from_config(&config)?;
    info!(analyzer = %runner.program().display(), timeout_secs = config.timeout_secs, "using analyzer");
    run_disassemble(&runner, &record, options)?;
    Ok(())
}

/// Run the prepare workflow with an explicit runner and print a summary.
pub fn run_disassemble(
    runner: &dyn ToolRunner,
    record: &ExecutableRecord,
    options: PrepareOptions,
) -> Result<PrepareOutcome> {
    let outcome = prepare_and_disassemble(runner, record, options)?;
    print_outcome(record, &outcome);
    Ok(outcome)
}

fn print_outcome(record: &ExecutableRecord, outcome: &PrepareOutcome) {
    if let ExtractionAction::Extracted(output) = &outcome.extraction {
        let text = output.combined();
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    let text = outcome.disassembly.output.combined();
    if !text.is_empty() {
        println!("{}", text);
    }

    let extraction = match &outcome.extraction {
        ExtractionAction::Skipped => "skipped (already extracted)",
        ExtractionAction::Restored => "restored from existing content",
        ExtractionAction::Extracted(_) => "ran extractor",
    };

    println!("Disassembled {} ({}):", record.name, record.format);
    println!("  Initial state: {}", outcome.initial_state);
    if outcome.reset_performed {
        println!("  Reset: yes");
    }
    println!("  Extraction: {}", extraction);
    println!("  Assembly log: {}", outcome.disassembly.asm_log.display());
    println!("  Orphan log:   {}", outcome.disassembly.orphan_log.display());
    if let Some(xml) = &outcome.disassembly.status_xml {
        println!("  Status XML:   {}", xml.display());
    }
    println!("  State: {}", outcome.disassembly.state);
}
