use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheLayout;

/// Preparation state of an executable's cache, derived from the directory tree.
///
/// Ordering follows the pipeline: `Absent < ArchivedOnly < Extracted < Disassembled`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CacheState {
    /// No extraction content, archive, or cache.
    Absent,
    /// Executable content is available (archive or standalone) but not saved in the cache.
    ArchivedOnly,
    /// Extraction artifacts are saved in the cache.
    Extracted,
    /// Disassembly logs are present alongside the saved extraction.
    Disassembled,
}

impl CacheState {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Absent => "absent",
            CacheState::ArchivedOnly => "archived-only",
            CacheState::Extracted => "extracted",
            CacheState::Disassembled => "disassembled",
        }
    }

    /// Pure mapping from a directory snapshot to a state.
    pub fn from_snapshot(snapshot: &CacheSnapshot) -> Self {
        if snapshot.saved_extract {
            if snapshot.asm_log && snapshot.orphan_log {
                CacheState::Disassembled
            } else {
                CacheState::Extracted
            }
        } else if snapshot.archive || snapshot.content {
            CacheState::ArchivedOnly
        } else {
            CacheState::Absent
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Existence flags for the subpaths that determine `CacheState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub archive: bool,
    pub content: bool,
    pub saved_extract: bool,
    pub asm_log: bool,
    pub orphan_log: bool,
}

impl CacheSnapshot {
    /// Read-only inspection of the layout's paths.
    pub fn capture(layout: &CacheLayout) -> Self {
        Self {
            archive: layout.archive_path.is_file(),
            content: layout.content_xinfo_path.is_file(),
            saved_extract: layout.xinfo_path.is_file(),
            asm_log: layout.asm_log_path.is_file(),
            orphan_log: layout.orphan_log_path.is_file(),
        }
    }
}

/// Inspect the cache and derive its state. Never mutates the filesystem.
pub fn probe(layout: &CacheLayout) -> CacheState {
    let snapshot = CacheSnapshot::capture(layout);
    let state = CacheState::from_snapshot(&snapshot);
    debug!(executable = %layout.name, ?snapshot, %state, "probed cache");
    state
}
