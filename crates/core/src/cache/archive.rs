//! Gzip tarball handling for the executable-content archive sibling.

use std::fs::{self, File};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::cache::CacheLayout;
use crate::pipeline::{PipelineError, PipelineResult};

/// Pack the standalone content directory into the archive sibling,
/// replacing any previous archive.
pub fn pack_content(layout: &CacheLayout) -> PipelineResult<()> {
    let dir_name = layout
        .content_dir
        .file_name()
        .ok_or_else(|| archive_error(&layout.content_dir, "content directory has no name"))?;

    let tmp_path = layout.archive_path.with_extension("gz.partial");
    let file = File::create(&tmp_path).map_err(|e| PipelineError::io(&tmp_path, e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(dir_name, &layout.content_dir)
        .map_err(|e| archive_error(&layout.archive_path, &format!("failed to pack: {e}")))?;
    let encoder = builder
        .into_inner()
        .map_err(|e| archive_error(&layout.archive_path, &format!("failed to pack: {e}")))?;
    encoder
        .finish()
        .map_err(|e| archive_error(&layout.archive_path, &format!("failed to compress: {e}")))?;

    fs::rename(&tmp_path, &layout.archive_path)
        .map_err(|e| PipelineError::io(&layout.archive_path, e))?;
    Ok(())
}

/// Unpack the archive sibling next to the executable, recreating the
/// standalone content directory.
pub fn unpack_content(layout: &CacheLayout) -> PipelineResult<()> {
    if !layout.archive_path.is_file() {
        return Err(archive_error(&layout.archive_path, "archive with executable content is missing"));
    }
    let parent = layout
        .archive_path
        .parent()
        .ok_or_else(|| archive_error(&layout.archive_path, "archive has no parent directory"))?;

    let file = File::open(&layout.archive_path).map_err(|e| PipelineError::io(&layout.archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .unpack(parent)
        .map_err(|e| archive_error(&layout.archive_path, &format!("failed to unpack: {e}")))?;

    if !layout.content_xinfo_path.is_file() {
        return Err(archive_error(
            &layout.archive_path,
            &format!("archive does not contain {}", layout.content_xinfo_path.display()),
        ));
    }
    Ok(())
}

fn archive_error(path: &Path, reason: &str) -> PipelineError {
    PipelineError::Archive { path: path.to_path_buf(), reason: reason.to_string() }
}
