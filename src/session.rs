//! Explicit session context shared by every command, persisted between runs.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::combine;
use crate::domain::{RepoCoordinate, DEFAULT_BRANCH};
use crate::llm::ChatMessage;

/// Where the aggregate for explanation comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    #[default]
    Repository,
    Upload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub mode: SourceMode,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Never written to disk.
    #[serde(skip)]
    pub token: Option<String>,
    pub save_locally: bool,
    pub repo_text: String,
    pub uploaded_text: String,
    pub last_explanation: Option<String>,
    pub graph_ready: bool,
    /// Free-form conversation, oldest first. Independent of the code sources.
    pub conversation: Vec<ChatMessage>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: SourceMode::Repository,
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            token: None,
            save_locally: true,
            repo_text: String::new(),
            uploaded_text: String::new(),
            last_explanation: None,
            graph_ready: false,
            conversation: Vec::new(),
            updated_at: None,
        }
    }
}

impl Session {
    pub fn coordinate(&self) -> RepoCoordinate {
        RepoCoordinate::new(&self.owner, &self.repo)
            .with_branch(&self.branch)
            .with_token(self.token.clone())
    }

    /// Aggregate for the current mode.
    pub fn active_text(&self) -> &str {
        match self.mode {
            SourceMode::Repository => &self.repo_text,
            SourceMode::Upload => &self.uploaded_text,
        }
    }

    /// Repository text followed by uploaded text; what the graph ingests.
    pub fn combined_text(&self) -> String {
        combine(&self.repo_text, &self.uploaded_text)
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// JSON file holding the last session.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing files give a fresh session; unreadable ones warn and do the same.
    pub fn load(&self) -> Session {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Session::default();
        };
        match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                Session::default()
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed writing session file {}", self.path.display()))?;
        Ok(())
    }

    /// Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed removing {}", self.path.display()))?;
        Ok(true)
    }
}
