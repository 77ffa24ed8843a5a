//! Command-line interface for repo-explain
//!
//! `fetch`, `explain`, `ask`, `talk` and `session` each run one action against
//! the stored session; `chat` drives the same actions from interactive prompts.
//! `image` generates a picture and needs no session.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::Config;
use crate::session::SessionStore;

mod ask;
mod cache;
mod chat;
mod explain;
mod fetch;
mod image;
mod session;
mod talk;
mod utils;

/// Explain a GitHub repository with an LLM and ask follow-up questions
#[derive(Parser)]
#[command(name = "repo-explain")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (TOML or YAML); otherwise repo-explain.toml etc. in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Session file [default: <cache dir>/repo-explain/session.json]
    #[arg(long, global = true, value_name = "FILE", env = "REPO_EXPLAIN_SESSION")]
    pub session: Option<PathBuf>,
}

impl GlobalArgs {
    /// Effective config: file, then environment, then `overrides`.
    pub fn settings(&self, overrides: &CliOverrides) -> Result<Config> {
        let cwd = std::env::current_dir()?;
        let file_config = load_config(&cwd, self.config.as_deref())?;
        merge_cli_with_config(file_config, overrides)
    }

    pub fn session_store(&self) -> Result<SessionStore> {
        cache::session_store(self.session.as_deref())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download a repository into the session, optionally mirroring and zipping it
    Fetch(Box<fetch::FetchArgs>),

    /// Fetch or upload sources, explain them and build the knowledge graph
    Explain(Box<explain::ExplainArgs>),

    /// Ask a question against the session's knowledge graph
    Ask(ask::AskArgs),

    /// Interactive session: choose a source, explain it, then ask questions
    Chat(chat::ChatArgs),

    /// Free-form conversation with the model, remembered in the session
    Talk(talk::TalkArgs),

    /// Generate an image from a text prompt
    Image(image::ImageArgs),

    /// Show or clear the stored session
    Session(session::SessionArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.global.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Fetch(args) => fetch::run(*args, &cli.global),
        Commands::Explain(args) => explain::run(*args, &cli.global),
        Commands::Ask(args) => ask::run(args, &cli.global),
        Commands::Chat(args) => chat::run(args, &cli.global),
        Commands::Talk(args) => talk::run(args, &cli.global),
        Commands::Image(args) => image::run(args, &cli.global),
        Commands::Session(args) => session::run(args, &cli.global),
    }
}
