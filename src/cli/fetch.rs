//! Fetch command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use super::utils::{format_with_commas, spinner};
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::{Config, DEFAULT_BRANCH};
use crate::fetch::{GitHubClient, HostingApi};
use crate::pipeline::{fetch_repository, FetchReport, Storage};
use crate::session::Session;

/// Which repository to fetch.
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Repository owner (user or organization); defaults to the session's
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Repository name; defaults to the session's
    #[arg(long, value_name = "NAME")]
    pub repo: Option<String>,

    /// Branch to read [default: main]
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Personal access token for private repositories or higher rate limits
    #[arg(long, value_name = "TOKEN", hide_env_values = true, env = "GITHUB_TOKEN")]
    pub token: Option<String>,
}

impl RepoArgs {
    pub fn is_given(&self) -> bool {
        self.owner.is_some() || self.repo.is_some()
    }

    /// Write the coordinate into `session`, falling back to the values it already holds.
    ///
    /// The session's branch survives unless a branch is configured or the
    /// repository itself changes, which starts again from the default branch.
    pub fn apply(&self, session: &mut Session, config: &Config) -> Result<()> {
        let previous = (session.owner.clone(), session.repo.clone());
        if let Some(owner) = &self.owner {
            session.owner = owner.trim().to_string();
        }
        if let Some(repo) = &self.repo {
            session.repo = repo.trim().to_string();
        }
        if session.owner.is_empty() || session.repo.is_empty() {
            anyhow::bail!("Repository owner and name are required (--owner, --repo)");
        }
        match &config.branch {
            Some(branch) => session.branch = branch.clone(),
            None if previous != (session.owner.clone(), session.repo.clone()) => {
                session.branch = DEFAULT_BRANCH.to_string();
            }
            None => {}
        }
        session.token = config.github_token.clone();
        Ok(())
    }
}

/// Local copies of the fetched tree.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Mirror every fetched file under DIR
    #[arg(long, value_name = "DIR", conflicts_with = "temp")]
    pub save_dir: Option<PathBuf>,

    /// Mirror into a temporary directory that is removed afterwards, keeping only its zip
    #[arg(long)]
    pub temp: bool,

    /// Also write <DIR>.zip next to the mirror
    #[arg(long, requires = "save_dir")]
    pub archive: bool,
}

impl StorageArgs {
    pub fn storage(&self) -> Storage {
        match (&self.save_dir, self.temp) {
            (Some(path), _) => Storage::Directory { path: path.clone(), archive: self.archive },
            (None, true) => Storage::Temporary,
            (None, false) => Storage::None,
        }
    }
}

#[derive(Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Write the aggregate text to FILE
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail when the tree nests deeper than this
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Fail when the tree holds more files than this
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,
}

pub fn run(args: FetchArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.settings(&CliOverrides {
        branch: args.repo.branch.clone(),
        github_token: args.repo.token.clone(),
        max_depth: args.max_depth,
        max_files: args.max_files,
        ..CliOverrides::default()
    })?;
    let store = global.session_store()?;
    let mut session = store.load();

    args.repo.apply(&mut session, &config)?;
    fetch_into_session(&mut session, &config, &args.storage.storage())?;
    store.save(&session)?;

    if let Some(output) = &args.output {
        fs::write(output, &session.repo_text)
            .with_context(|| format!("Failed writing {}", output.display()))?;
        eprintln!("Wrote aggregate to {}", output.display());
    }
    Ok(())
}

/// Fetch the session's repository from the configured host behind a spinner.
pub fn fetch_into_session(
    session: &mut Session,
    config: &Config,
    storage: &Storage,
) -> Result<FetchReport> {
    fetch_from(session, &github_client(config)?, config, storage)
}

pub fn github_client(config: &Config) -> Result<GitHubClient> {
    Ok(GitHubClient::new(
        &config.api_base,
        &config.raw_base,
        Duration::from_secs(config.request_timeout_secs),
    )?)
}

/// Same as [`fetch_into_session`], against any host.
pub fn fetch_from(
    session: &mut Session,
    api: &dyn HostingApi,
    config: &Config,
    storage: &Storage,
) -> Result<FetchReport> {
    let slug = session.coordinate().slug();
    let progress = spinner(format!("Fetching {slug}"));
    let result = fetch_repository(session, api, config.fetch_limits(), storage, |path| {
        progress.set_message(format!("Fetching {slug}: {path}"));
    });
    progress.finish_and_clear();

    let report = result.with_context(|| format!("Failed to fetch {slug}"))?;
    print_report(&slug, &report);
    Ok(report)
}

fn print_report(slug: &str, report: &FetchReport) {
    eprintln!(
        "Fetched {} file(s) ({} bytes) from {}",
        format_with_commas(report.stats.files_fetched),
        format_with_commas(report.aggregate_bytes),
        slug
    );
    eprintln!(
        "  Listed {} director(ies), {} level(s) deep",
        format_with_commas(report.stats.directories_listed),
        report.stats.max_depth_seen
    );
    if let Some(root) = &report.mirror_root {
        eprintln!("  Mirror:  {}", root.display());
    }
    if let Some(archive) = &report.archive_path {
        eprintln!("  Archive: {}", archive.display());
    }
}
