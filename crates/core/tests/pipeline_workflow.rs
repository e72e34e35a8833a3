use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use binprep_core::cache::{probe, CacheLock, CacheManager, CacheManifest, CacheState};
use binprep_core::model::{ExecutableFormat, ExecutableRecord};
use binprep_core::pipeline::{
    prepare_and_disassemble, DisassemblyStage, ExtractMode, ExtractionAction, ExtractionStage,
    PipelineError, PrepareOptions, Stage,
};
use binprep_core::tools::{ToolError, ToolMode, ToolOutput, ToolRunner};
use tempfile::tempdir;

type Behavior = dyn Fn(ToolMode, &Path, &str) -> Result<ToolOutput, ToolError> + Send + Sync;

/// Records every invocation and writes the files a real analyzer would.
struct FakeAnalyzer {
    calls: Mutex<Vec<(ToolMode, Vec<String>, PathBuf)>>,
    behavior: Box<Behavior>,
}

impl FakeAnalyzer {
    fn well_behaved() -> Self {
        Self::with(|mode, cwd, name| {
            write_artifacts(mode, cwd, name);
            Ok(ok_output(&format!("{mode} done")))
        })
    }

    fn with(
        behavior: impl Fn(ToolMode, &Path, &str) -> Result<ToolOutput, ToolError> + Send + Sync + 'static,
    ) -> Self {
        Self { calls: Mutex::new(Vec::new()), behavior: Box::new(behavior) }
    }

    fn modes(&self) -> Vec<ToolMode> {
        self.calls.lock().unwrap().iter().map(|(mode, _, _)| *mode).collect()
    }
}

impl ToolRunner for FakeAnalyzer {
    fn run(&self, mode: ToolMode, args: &[String], cwd: &Path) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push((mode, args.to_vec(), cwd.to_path_buf()));
        let name = args.last().cloned().unwrap_or_default();
        (self.behavior)(mode, cwd, &name)
    }
}

fn ok_output(stdout: &str) -> ToolOutput {
    ToolOutput { exit_code: Some(0), stdout: stdout.to_string(), stderr: String::new() }
}

fn write_artifacts(mode: ToolMode, dir: &Path, name: &str) {
    match mode {
        ToolMode::Extract | ToolMode::ExtractHex => {
            let content = dir.join(format!("{name}.chx"));
            fs::create_dir_all(content.join("functions")).unwrap();
            fs::write(content.join(format!("{name}_xinfo.xml")), "<xinfo/>").unwrap();
            fs::write(content.join("functions").join("f0.xml"), "<f/>").unwrap();
        }
        ToolMode::Disassemble { xml } => {
            let analysis = dir.join(format!("{name}.ch")).join("analysis");
            fs::create_dir_all(&analysis).unwrap();
            fs::write(analysis.join(format!("{name}_asm.log")), "0x401000 push ebp\n").unwrap();
            fs::write(analysis.join(format!("{name}_orphan.log")), "").unwrap();
            if xml {
                fs::write(analysis.join(format!("{name}_disassembly_status.xml")), "<status/>")
                    .unwrap();
            }
        }
    }
}

fn setup_executable(dir: &Path, name: &str, format: ExecutableFormat) -> ExecutableRecord {
    fs::write(dir.join(name), b"MZ\x90\x00fake executable").unwrap();
    ExecutableRecord { dir: dir.to_path_buf(), name: name.to_string(), format, dependencies: vec![] }
}

#[test]
fn fresh_executable_is_extracted_then_disassembled() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();

    let outcome = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    assert_eq!(outcome.initial_state, CacheState::Absent);
    assert!(!outcome.reset_performed);
    assert!(matches!(outcome.extraction, ExtractionAction::Extracted(_)));
    assert_eq!(outcome.disassembly.state, CacheState::Disassembled);
    assert!(outcome.disassembly.status_xml.is_none());
    assert_eq!(runner.modes(), [ToolMode::Extract, ToolMode::Disassemble { xml: false }]);

    let layout = record.layout();
    assert!(layout.archive_path.is_file(), "save_extract should pack the archive");
    assert!(layout.extract_dir.join("functions").join("f0.xml").is_file());
    assert!(layout.manifest_path.is_file());
    drop(CacheLock::acquire(&layout).expect("lock must be released"));
    let log = fs::read_to_string(layout.stage_log_path("disassembly")).unwrap();
    assert!(log.contains("exit status 0"));
}

#[test]
fn analyzer_receives_format_flags_and_runs_next_to_executable() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "router", ExecutableFormat::MipsElf);
    let runner = FakeAnalyzer::well_behaved();

    prepare_and_disassemble(&runner, &record, PrepareOptions { emit_xml: true, ..Default::default() })
        .unwrap();

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    for (_, args, cwd) in calls.iter() {
        assert_eq!(args, &["-mips", "-elf", "router"]);
        assert_eq!(cwd, temp.path());
    }
    assert_eq!(calls[1].0.flags(), ["-disassemble", "-xml"]);
}

#[test]
fn second_run_skips_extraction() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();

    prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();
    let outcome = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    assert_eq!(outcome.initial_state, CacheState::Disassembled);
    assert!(matches!(outcome.extraction, ExtractionAction::Skipped));
    assert_eq!(
        runner.modes(),
        [
            ToolMode::Extract,
            ToolMode::Disassemble { xml: false },
            ToolMode::Disassemble { xml: false }
        ]
    );
}

#[test]
fn reset_restores_from_archive_without_rerunning_extractor() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();
    prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    // Only the archive remains of the executable content.
    fs::remove_dir_all(record.layout().content_dir).unwrap();

    let outcome =
        prepare_and_disassemble(&runner, &record, PrepareOptions { reset: true, ..Default::default() })
            .unwrap();

    assert!(outcome.reset_performed);
    assert!(matches!(outcome.extraction, ExtractionAction::Restored));
    assert_eq!(outcome.disassembly.state, CacheState::Disassembled);
    assert!(record.layout().content_xinfo_path.is_file());
    assert_eq!(runner.modes().iter().filter(|m| matches!(m, ToolMode::Extract)).count(), 1);
}

#[test]
fn changed_executable_forces_reextraction() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();
    prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    fs::write(record.path(), b"MZ\x90\x00patched executable").unwrap();
    let outcome = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    assert!(outcome.reset_performed);
    assert!(matches!(outcome.extraction, ExtractionAction::Extracted(_)));
    assert_eq!(runner.modes().iter().filter(|m| matches!(m, ToolMode::Extract)).count(), 2);
}

#[test]
fn changed_executable_never_falls_back_to_old_content() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let run = Arc::new(AtomicUsize::new(1));
    let phase = Arc::clone(&run);
    let runner = FakeAnalyzer::with(move |mode, cwd, name| {
        if matches!(mode, ToolMode::Extract | ToolMode::ExtractHex) {
            match phase.load(Ordering::SeqCst) {
                2 => {
                    return Ok(ToolOutput {
                        exit_code: Some(1),
                        stdout: String::new(),
                        stderr: "truncated header".into(),
                    })
                }
                version => {
                    let content = cwd.join(format!("{name}.chx"));
                    fs::create_dir_all(&content).unwrap();
                    fs::write(content.join(format!("{name}_xinfo.xml")), format!("<v{version}/>"))
                        .unwrap();
                }
            }
        } else {
            write_artifacts(mode, cwd, name);
        }
        Ok(ok_output(""))
    });
    prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    fs::write(record.path(), b"MZ\x90\x00patched executable").unwrap();
    run.store(2, Ordering::SeqCst);
    let err = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::ExternalTool { stage: Stage::Extraction, .. }));
    let layout = record.layout();
    assert!(!layout.content_dir.exists(), "content of the old executable must be gone");
    assert!(!layout.archive_path.exists(), "archive of the old executable must be gone");
    assert_eq!(probe(&layout), CacheState::Absent);

    run.store(3, Ordering::SeqCst);
    let outcome = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    assert!(matches!(outcome.extraction, ExtractionAction::Extracted(_)));
    assert_eq!(fs::read_to_string(&layout.xinfo_path).unwrap(), "<v3/>");
    assert!(!CacheManifest::load(&layout).unwrap().is_stale_for(&record));
}

#[test]
fn hex_input_uses_extracthex_mode() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "dump.hex", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();

    prepare_and_disassemble(&runner, &record, PrepareOptions { hex_input: true, ..Default::default() })
        .unwrap();

    assert_eq!(runner.modes()[0], ToolMode::ExtractHex);
}

#[test]
fn held_lock_fails_before_any_process_runs() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let held = CacheLock::acquire(&record.layout()).unwrap();
    let runner = FakeAnalyzer::well_behaved();

    let err = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap_err();

    assert!(matches!(err, PipelineError::CacheLocked(_)), "unexpected error: {err}");
    assert!(runner.modes().is_empty());
    assert!(record.layout().lock_path.exists(), "a foreign lock must not be removed");
    drop(held);
}

#[test]
fn lock_file_left_by_dead_run_does_not_block() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    // A killed run leaves its file behind but the kernel drops its lock.
    fs::write(record.layout().lock_path, "999999\n").unwrap();
    let runner = FakeAnalyzer::well_behaved();

    let outcome = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    assert_eq!(outcome.disassembly.state, CacheState::Disassembled);
    assert_ne!(fs::read_to_string(record.layout().lock_path).unwrap(), "999999\n");
}

#[test]
fn failed_disassembly_reports_output_and_keeps_extracted_state() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::with(|mode, cwd, name| match mode {
        ToolMode::Disassemble { .. } => Ok(ToolOutput {
            exit_code: Some(2),
            stdout: "bad opcode at 0x401020\n".into(),
            stderr: String::new(),
        }),
        _ => {
            write_artifacts(mode, cwd, name);
            Ok(ok_output("extracted"))
        }
    });

    let err = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap_err();

    match &err {
        PipelineError::ExternalTool { stage, status, output } => {
            assert_eq!(*stage, Stage::Disassembly);
            assert_eq!(status, "exit status 2");
            assert_eq!(output, "bad opcode at 0x401020");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("bad opcode at 0x401020"));
    assert_eq!(probe(&record.layout()), CacheState::Extracted);
    assert!(CacheLock::acquire(&record.layout()).is_ok(), "lock must be released on error");
}

#[test]
fn failed_extraction_leaves_state_unchanged() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::with(|_, _, _| {
        Ok(ToolOutput { exit_code: Some(1), stdout: String::new(), stderr: "no such section".into() })
    });

    let err = ExtractionStage::new(&runner).extract(&record, ExtractMode::Normal).unwrap_err();

    assert!(matches!(err, PipelineError::ExternalTool { stage: Stage::Extraction, .. }));
    assert!(err.to_string().contains("no such section"));
    assert_eq!(probe(&record.layout()), CacheState::Absent);
}

#[test]
fn extraction_without_save_does_not_advance_state() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();
    let stage = ExtractionStage::new(&runner);

    stage.extract(&record, ExtractMode::Normal).unwrap();
    assert_eq!(probe(&record.layout()), CacheState::ArchivedOnly);

    assert_eq!(stage.save_extract(&record).unwrap(), CacheState::Extracted);
}

#[test]
fn extractor_that_writes_nothing_is_reported() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::with(|_, _, _| Ok(ok_output("")));

    let err = ExtractionStage::new(&runner).extract(&record, ExtractMode::Normal).unwrap_err();
    assert!(matches!(err, PipelineError::MissingArtifact { stage: Stage::Extraction, .. }));
}

#[test]
fn disassembly_requires_extracted_cache() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();

    let err = DisassemblyStage::new(&runner).disassemble(&record, false).unwrap_err();

    match err {
        PipelineError::NotReady { found, required, .. } => {
            assert_eq!(found, CacheState::Absent);
            assert_eq!(required, CacheState::Extracted);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.modes().is_empty());
}

#[test]
fn missing_xml_status_is_reported_when_requested() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::with(|mode, cwd, name| {
        // Ignore the xml request.
        let mode = match mode {
            ToolMode::Disassemble { .. } => ToolMode::Disassemble { xml: false },
            other => other,
        };
        write_artifacts(mode, cwd, name);
        Ok(ok_output(""))
    });

    let err = prepare_and_disassemble(&runner, &record, PrepareOptions { emit_xml: true, ..Default::default() })
        .unwrap_err();

    match err {
        PipelineError::MissingArtifact { stage, path } => {
            assert_eq!(stage, Stage::Disassembly);
            assert_eq!(path, record.layout().status_xml_path);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn tool_timeout_maps_to_its_own_error_kind() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::with(|_, _, _| Err(ToolError::Timeout { seconds: 5 }));

    let err = prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap_err();

    assert!(matches!(err, PipelineError::ToolTimeout { stage: Stage::Extraction, seconds: 5 }));
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn manifest_records_disassembly() {
    let temp = tempdir().unwrap();
    let record = setup_executable(temp.path(), "sample.exe", ExecutableFormat::X86Pe);
    let runner = FakeAnalyzer::well_behaved();
    prepare_and_disassemble(&runner, &record, PrepareOptions::default()).unwrap();

    let manager = CacheManager::new(&record);
    let manifest = binprep_core::cache::CacheManifest::load(manager.layout()).unwrap();
    assert_eq!(manifest.executable, "sample.exe");
    assert_eq!(manifest.format, ExecutableFormat::X86Pe);
    assert_eq!(manifest.sha256, binprep_core::util::sha256_file(&record.path()).unwrap());
    assert!(manifest.disassembled_at.is_some());
    assert!(!manifest.is_stale_for(&record));
}
