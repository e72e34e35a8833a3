use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::cache::CacheLayout;
use crate::pipeline::{PipelineError, PipelineResult};

/// Exclusive OS lock on an executable's cache, held for the guard's lifetime.
///
/// The lock file itself is left in place; only the kernel lock matters, so a
/// run that dies without dropping the guard does not block the next one.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
    file: File,
}

impl CacheLock {
    /// Take the lock without waiting; fails with `CacheLocked` if another
    /// handle holds it.
    pub fn acquire(layout: &CacheLayout) -> PipelineResult<Self> {
        let path = layout.lock_path.clone();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| PipelineError::io(&path, e))?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(PipelineError::CacheLocked(path));
            }
            return Err(PipelineError::io(&path, e));
        }

        // Owner pid, for whoever inspects a busy lock by hand.
        file.set_len(0).map_err(|e| PipelineError::io(&path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| PipelineError::io(&path, e))?;
        debug!(lock = %path.display(), "acquired cache lock");
        Ok(Self { path, file })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "failed to release cache lock");
        }
    }
}
