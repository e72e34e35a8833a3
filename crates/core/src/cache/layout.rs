use std::path::{Path, PathBuf};

/// Logical layout of the per-executable cache on disk.
///
/// This is derived from the executable's directory and base name. It does *not*
/// perform any IO itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// Base filename of the executable.
    pub name: String,
    /// The executable itself.
    pub executable: PathBuf,
    /// Standalone executable content written by the extractor (`<name>.chx`).
    pub content_dir: PathBuf,
    /// Marker artifact inside the standalone content directory.
    pub content_xinfo_path: PathBuf,
    /// Compressed archive sibling of the executable (`<name>.chx.tar.gz`).
    pub archive_path: PathBuf,
    /// Root of the analysis cache (`<name>.ch`).
    pub cache_dir: PathBuf,
    /// Saved extraction artifacts (`<name>.ch/x`).
    pub extract_dir: PathBuf,
    /// Saved marker artifact; its presence means the cache is extracted.
    pub xinfo_path: PathBuf,
    /// Disassembly outputs (`<name>.ch/analysis`).
    pub analysis_dir: PathBuf,
    pub asm_log_path: PathBuf,
    pub orphan_log_path: PathBuf,
    pub status_xml_path: PathBuf,
    /// Captured external-process output (`<name>.ch/logs`).
    pub logs_dir: PathBuf,
    /// Persisted analysis results (`<name>.ch/results`).
    pub results_dir: PathBuf,
    pub results_db_path: PathBuf,
    pub manifest_path: PathBuf,
    /// Advisory lock guarding the cache directory.
    pub lock_path: PathBuf,
}

impl CacheLayout {
    /// Compute the layout for executable `name` living in `dir`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        let executable = dir.join(name);
        let content_dir = dir.join(format!("{name}.chx"));
        let content_xinfo_path = content_dir.join(xinfo_file_name(name));
        let archive_path = dir.join(format!("{name}.chx.tar.gz"));
        let cache_dir = dir.join(format!("{name}.ch"));
        let extract_dir = cache_dir.join("x");
        let xinfo_path = extract_dir.join(xinfo_file_name(name));
        let analysis_dir = cache_dir.join("analysis");
        let asm_log_path = analysis_dir.join(format!("{name}_asm.log"));
        let orphan_log_path = analysis_dir.join(format!("{name}_orphan.log"));
        let status_xml_path = analysis_dir.join(format!("{name}_disassembly_status.xml"));
        let logs_dir = cache_dir.join("logs");
        let results_dir = cache_dir.join("results");
        let results_db_path = results_dir.join(format!("{name}_results.db"));
        let manifest_path = cache_dir.join("manifest.json");
        let lock_path = dir.join(format!("{name}.ch.lock"));

        Self {
            name: name.to_string(),
            executable,
            content_dir,
            content_xinfo_path,
            archive_path,
            cache_dir,
            extract_dir,
            xinfo_path,
            analysis_dir,
            asm_log_path,
            orphan_log_path,
            status_xml_path,
            logs_dir,
            results_dir,
            results_db_path,
            manifest_path,
            lock_path,
        }
    }

    /// Path of the captured-output log for a named stage.
    pub fn stage_log_path(&self, stage: &str) -> PathBuf {
        self.logs_dir.join(format!("{stage}.log"))
    }
}

fn xinfo_file_name(name: &str) -> String {
    format!("{name}_xinfo.xml")
}
