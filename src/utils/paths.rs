//! Path normalization

use std::path::{Component, Path, PathBuf};

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and normalize
    path.replace('\\', "/")
}

/// Turn a slash-separated repository path into a relative filesystem path.
///
/// Returns `None` for empty paths and for anything that could escape the
/// mirror root (`..`, absolute paths, drive prefixes).
pub fn sanitize_relative_path(path: &str) -> Option<PathBuf> {
    let normalized = normalize_path(path);
    let mut out = PathBuf::new();
    for comp in Path::new(&normalized).components() {
        match comp {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
