//! Scoped local storage for a fetched repository.

use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Directory that receives the mirrored repository.
///
/// Temporary mirrors are removed when dropped; an archive written next to the
/// root (`<root>.zip`) is left in place.
pub struct LocalMirror {
    root: PathBuf,
    is_temp: bool,
}

impl LocalMirror {
    /// Use (and create) a caller-chosen directory. It is never deleted.
    pub fn persistent(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, is_temp: false })
    }

    /// Create a fresh directory under the system temp dir.
    pub fn temporary(label: &str) -> Result<Self> {
        let root = build_temp_mirror_dir(label);
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, is_temp: true })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_temp(&self) -> bool {
        self.is_temp
    }
}

impl Drop for LocalMirror {
    fn drop(&mut self) {
        if self.is_temp {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }
}

fn build_temp_mirror_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let pid = std::process::id();
    let label: String =
        label.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' }).collect();
    env::temp_dir().join(format!("repo-explain-{label}-{pid}-{nanos}"))
}
