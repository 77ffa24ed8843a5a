//! Shared cache path helpers for CLI commands.

use std::path::{Path, PathBuf};

use crate::session::SessionStore;

/// Session file chosen by `--session`, else `<cache>/repo-explain/session.json`.
pub fn session_store(explicit: Option<&Path>) -> anyhow::Result<SessionStore> {
    if let Some(path) = explicit {
        return Ok(SessionStore::new(path));
    }
    let base = cache_root_dir()
        .ok_or_else(|| anyhow::anyhow!("No cache directory found; pass --session <FILE>"))?;
    Ok(SessionStore::new(default_session_path(&base)))
}

pub fn default_session_path(cache_base: &Path) -> PathBuf {
    cache_base.join("repo-explain").join("session.json")
}

pub fn cache_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
            return Some(PathBuf::from(xdg));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache"))
    }
}
