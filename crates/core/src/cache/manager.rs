use std::fs;

use tracing::{debug, info};

use crate::cache::{archive, probe, CacheLayout, CacheState};
use crate::model::ExecutableRecord;
use crate::pipeline::{PipelineError, PipelineResult};

/// Owner of one executable's cache directory.
///
/// `probe` is read-only; `reset` is the only operation that rewinds state.
#[derive(Debug, Clone)]
pub struct CacheManager {
    layout: CacheLayout,
}

impl CacheManager {
    pub fn new(record: &ExecutableRecord) -> Self {
        Self { layout: record.layout() }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn probe(&self) -> CacheState {
        probe(&self.layout)
    }

    /// Delete the cache directory, then restore the standalone executable
    /// content from the archive sibling if it is not already present.
    ///
    /// The deletion happens even when restoring fails.
    pub fn reset(&self) -> PipelineResult<CacheState> {
        self.clear()?;

        if self.layout.content_xinfo_path.is_file() {
            debug!(content = %self.layout.content_dir.display(), "executable content already present");
        } else {
            info!(archive = %self.layout.archive_path.display(), "unpacking executable content");
            archive::unpack_content(&self.layout)?;
        }

        Ok(self.probe())
    }

    /// Delete the cache directory only, leaving content and archive alone.
    pub fn clear(&self) -> PipelineResult<CacheState> {
        if self.layout.cache_dir.is_dir() {
            info!(cache = %self.layout.cache_dir.display(), "removing cache directory");
            fs::remove_dir_all(&self.layout.cache_dir)
                .map_err(|e| PipelineError::io(&self.layout.cache_dir, e))?;
        }
        Ok(self.probe())
    }

    /// Delete the standalone content directory and its archive.
    ///
    /// Used when the executable has changed, so neither can be trusted to
    /// describe it any more.
    pub fn discard_content(&self) -> PipelineResult<CacheState> {
        if self.layout.content_dir.is_dir() {
            info!(content = %self.layout.content_dir.display(), "removing executable content");
            fs::remove_dir_all(&self.layout.content_dir)
                .map_err(|e| PipelineError::io(&self.layout.content_dir, e))?;
        }
        if self.layout.archive_path.is_file() {
            info!(archive = %self.layout.archive_path.display(), "removing content archive");
            fs::remove_file(&self.layout.archive_path)
                .map_err(|e| PipelineError::io(&self.layout.archive_path, e))?;
        }
        Ok(self.probe())
    }

    /// Reset only when there is something to clear; a never-prepared
    /// executable is already clean and is left untouched.
    pub fn ensure_clean_for_extraction(&self) -> PipelineResult<CacheState> {
        let state = self.probe();
        if state == CacheState::Absent && !self.layout.cache_dir.exists() {
            debug!(executable = %self.layout.name, "cache already clean");
            return Ok(state);
        }
        self.reset()
    }
}
