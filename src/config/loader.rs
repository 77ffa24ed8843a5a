//! Config file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Table name a config file may nest its settings under.
const NESTED_SECTION: &str = "repo-explain";

const CANDIDATES: [&str; 6] = [
    "repo-explain.toml",
    ".repo-explain.toml",
    "repo-explain.yml",
    ".repo-explain.yml",
    "repo-explain.yaml",
    ".repo-explain.yaml",
];

/// Load the config file named by `config_path`, or the first candidate found in `search_root`.
///
/// An explicit file that cannot be read or parsed is an error. An
/// auto-discovered one only warns and yields the defaults.
pub fn load_config(search_root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let explicit = config_path.is_some();
    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(search_root),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    match read_config_file(&config_file) {
        Ok(cfg) => {
            tracing::debug!("loaded config from {}", config_file.display());
            Ok(cfg)
        }
        Err(e) if !explicit => {
            tracing::warn!("Ignoring auto-discovered config {}: {:#}", config_file.display(), e);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

fn read_config_file(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(&content, config_file),
        "yaml" | "yml" => parse_yaml_config(&content, config_file),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        )),
    }
}

fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;
    let section = raw.get(NESTED_SECTION).cloned().unwrap_or(raw);
    section.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;
    let section = raw.get(NESTED_SECTION).cloned().unwrap_or(raw);
    serde_yaml::from_value(section)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(search_root: &Path) -> Option<PathBuf> {
    CANDIDATES.iter().map(|name| search_root.join(name)).find(|path| path.is_file())
}
