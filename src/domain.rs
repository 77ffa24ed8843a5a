//! Core data types: repository coordinates, tree entries, fetch limits and config.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_IMAGE_API_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";
pub const DEFAULT_EXPLAIN_MAX_CHARS: usize = 16_000;
pub const DEFAULT_EXPLAIN_PROMPT: &str = "Explain the following repository. Describe its purpose, \
     its main components and how they fit together. Answer in Markdown.\n\n";

/// Identifies one remote tree snapshot. Immutable once a fetch begins.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoCoordinate {
    pub owner: String,
    pub name: String,
    pub branch: String,
    pub token: Option<String>,
}

impl RepoCoordinate {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: DEFAULT_BRANCH.to_string(),
            token: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        if !branch.trim().is_empty() {
            self.branch = branch.trim().to_string();
        }
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// `owner/name@branch`, used in logs and archive names.
    pub fn slug(&self) -> String {
        format!("{}/{}@{}", self.owner, self.name, self.branch)
    }
}

// Keeps the token out of logs and panic messages.
impl fmt::Debug for RepoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoCoordinate")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::File }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Directory }
    }
}

/// Raw content of one fetched file.
#[derive(Debug, Clone)]
pub struct FileBytes {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Bounds on a single traversal. `None` disables a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub max_aggregate_bytes: Option<usize>,
}

impl FetchLimits {
    pub fn unbounded() -> Self {
        Self { max_depth: None, max_files: None, max_aggregate_bytes: None }
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_depth: Some(32),
            max_files: Some(5_000),
            max_aggregate_bytes: Some(50 * 1024 * 1024),
        }
    }
}

/// Effective configuration after merging defaults, config file, environment and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub raw_base: String,
    /// Branch set by file, environment or flag. `None` keeps the session's.
    pub branch: Option<String>,
    pub github_token: Option<String>,
    pub request_timeout_secs: u64,

    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    /// Temperature for free-form conversation, where variety is wanted.
    pub chat_temperature: f32,
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,

    pub image_api_url: String,
    pub image_api_token: Option<String>,

    pub explain_max_chars: usize,
    pub explain_prompt: String,

    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub max_aggregate_bytes: Option<usize>,

    #[serde(deserialize_with = "deserialize_extensions")]
    pub upload_extensions: Vec<String>,

    pub graph_chunk_tokens: usize,
    pub graph_chunk_overlap: usize,
    pub graph_top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        let limits = FetchLimits::default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
            branch: None,
            github_token: None,
            request_timeout_secs: 30,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.2,
            chat_temperature: 0.9,
            llm_api_key: None,
            llm_timeout_secs: 120,
            image_api_url: DEFAULT_IMAGE_API_URL.to_string(),
            image_api_token: None,
            explain_max_chars: DEFAULT_EXPLAIN_MAX_CHARS,
            explain_prompt: DEFAULT_EXPLAIN_PROMPT.to_string(),
            max_depth: limits.max_depth,
            max_files: limits.max_files,
            max_aggregate_bytes: limits.max_aggregate_bytes,
            upload_extensions: default_upload_extensions(),
            graph_chunk_tokens: 400,
            graph_chunk_overlap: 40,
            graph_top_k: 6,
        }
    }
}

impl Config {
    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            max_depth: self.max_depth,
            max_files: self.max_files,
            max_aggregate_bytes: self.max_aggregate_bytes,
        }
    }
}

pub fn default_upload_extensions() -> Vec<String> {
    vec!["py".to_string(), "ipynb".to_string()]
}

/// Lowercase an extension and drop any leading dot: `.PY` -> `py`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Accept either `"py, ipynb"` or `["py", ".ipynb"]`.
fn deserialize_extensions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let raw = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        StringOrList::Many(v) => v,
    };
    Ok(raw.iter().map(|e| normalize_extension(e)).filter(|e| !e.is_empty()).collect())
}
