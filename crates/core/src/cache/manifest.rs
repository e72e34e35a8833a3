use std::fs;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::CacheLayout;
use crate::model::{ExecutableFormat, ExecutableRecord};
use crate::pipeline::{PipelineError, PipelineResult};
use crate::util::sha256_file;

/// Bookkeeping stored at `<name>.ch/manifest.json`.
///
/// The manifest is informational: `CacheState` is never derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub executable: String,
    pub format: ExecutableFormat,
    /// SHA-256 of the executable at extraction time.
    pub sha256: String,
    pub extracted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disassembled_at: Option<String>,
}

impl CacheManifest {
    /// Build a fresh manifest for a just-saved extraction.
    pub fn for_extraction(record: &ExecutableRecord) -> PipelineResult<Self> {
        let path = record.path();
        let sha256 = sha256_file(&path).map_err(|e| PipelineError::io(&path, e))?;
        Ok(Self {
            executable: record.name.clone(),
            format: record.format,
            sha256,
            extracted_at: Utc::now().to_rfc3339(),
            disassembled_at: None,
        })
    }

    /// Load the manifest if present. A missing or unreadable manifest yields `None`.
    pub fn load(layout: &CacheLayout) -> Option<Self> {
        let body = fs::read_to_string(&layout.manifest_path).ok()?;
        serde_json::from_str(&body).ok()
    }

    pub fn save(&self, layout: &CacheLayout) -> PipelineResult<()> {
        fs::create_dir_all(&layout.cache_dir).map_err(|e| PipelineError::io(&layout.cache_dir, e))?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::io(&layout.manifest_path, std::io::Error::other(e)))?;
        fs::write(&layout.manifest_path, json).map_err(|e| PipelineError::io(&layout.manifest_path, e))
    }

    pub fn mark_disassembled(&mut self) {
        self.disassembled_at = Some(Utc::now().to_rfc3339());
    }

    /// True when the executable on disk no longer matches the recorded hash.
    pub fn is_stale_for(&self, record: &ExecutableRecord) -> bool {
        match sha256_file(&record.path()) {
            Ok(current) => current != self.sha256,
            Err(_) => true,
        }
    }
}
