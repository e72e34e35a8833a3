use std::path::Path;

use anyhow::Result;
use binprep_core::cache::{CacheManifest, CacheSnapshot, CacheState};
use serde::Serialize;

use crate::commands::util::{load_config, print_json, print_path_status, resolve_executable};

/// Machine-readable view of an executable's cache.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub executable: String,
    pub format: String,
    pub state: CacheState,
    pub snapshot: CacheSnapshot,
    pub cache_dir: String,
    pub results_db: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<CacheManifest>,
}

/// Show the derived cache state and key paths for `file`. Read-only.
pub fn status_command(config_path: Option<&Path>, file: &str, format: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let record = resolve_executable(&config, file, format)?;
    let layout = record.layout();
    let snapshot = CacheSnapshot::capture(&layout);

    let report = StatusReport {
        executable: record.path().display().to_string(),
        format: record.format.to_string(),
        state: CacheState::from_snapshot(&snapshot),
        snapshot,
        cache_dir: layout.cache_dir.display().to_string(),
        results_db: layout.results_db_path.display().to_string(),
        manifest: CacheManifest::load(&layout),
    };

    if json {
        return print_json(&report, "status");
    }

    println!("Executable: {}", report.executable);
    println!("Format: {}", report.format);
    println!("State: {}", report.state);
    println!();
    println!("Paths:");
    print_path_status("Archive", &layout.archive_path);
    print_path_status("Content", &layout.content_dir);
    print_path_status("Cache dir", &layout.cache_dir);
    print_path_status("Assembly log", &layout.asm_log_path);
    print_path_status("Orphan log", &layout.orphan_log_path);
    print_path_status("Results DB", &layout.results_db_path);
    if let Some(manifest) = &report.manifest {
        println!();
        println!("Manifest:");
        println!("  SHA-256: {}", manifest.sha256);
        println!("  Extracted at: {}", manifest.extracted_at);
        if let Some(at) = &manifest.disassembled_at {
            println!("  Disassembled at: {}", at);
        }
    }
    Ok(())
}
