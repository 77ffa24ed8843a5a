//! Local mirroring of fetched files and zip archival.

use crate::error::Result;
use crate::utils::sanitize_relative_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod archive;
pub mod mirror;

pub use archive::{archive, archive_to_sibling, sibling_archive_path};
pub use mirror::LocalMirror;

/// Write `bytes` to `root/relative_path`, creating parent directories.
///
/// Existing files are overwritten silently. Paths that would land outside
/// `root` are rejected with `InvalidInput`.
pub fn persist(root: &Path, relative_path: &str, bytes: &[u8]) -> Result<PathBuf> {
    let rel = sanitize_relative_path(relative_path).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to write outside mirror root: {relative_path}"),
        )
    })?;
    let target = root.join(rel);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;
    tracing::debug!("persisted {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}
