//! Session command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;

use super::utils::format_with_commas;
use super::GlobalArgs;
use crate::session::{Session, SourceMode};

#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Print what the stored session holds
    Show {
        /// Also print the last explanation
        #[arg(long)]
        explanation: bool,
    },

    /// Delete the stored session
    Clear,
}

pub fn run(args: SessionArgs, global: &GlobalArgs) -> Result<()> {
    let store = global.session_store()?;
    match args.action {
        SessionAction::Show { explanation } => {
            let session = store.load();
            println!("Session file: {}", store.path().display());
            print!("{}", describe(&session));
            if explanation {
                if let Some(text) = &session.last_explanation {
                    println!();
                    println!("{text}");
                }
            }
        }
        SessionAction::Clear => {
            if store.clear()? {
                println!("Removed {}", store.path().display());
            } else {
                println!("No session stored at {}", store.path().display());
            }
        }
    }
    Ok(())
}

fn describe(session: &Session) -> String {
    let repository = if session.owner.is_empty() {
        "(none)".to_string()
    } else {
        session.coordinate().slug()
    };
    let mode = match session.mode {
        SourceMode::Repository => "repository",
        SourceMode::Upload => "upload",
    };
    let graph =
        if session.graph_ready { style("ready").green() } else { style("not built").yellow() };
    let updated = session
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let explained = if session.last_explanation.is_some() { "yes" } else { "no" };
    let repo_chars = format_with_commas(session.repo_text.chars().count());
    let upload_chars = format_with_commas(session.uploaded_text.chars().count());

    let mut out = String::new();
    out.push_str(&format!("  Mode:           {mode}\n"));
    out.push_str(&format!("  Repository:     {repository}\n"));
    out.push_str(&format!("  Repo text:      {repo_chars} chars\n"));
    out.push_str(&format!("  Uploaded text:  {upload_chars} chars\n"));
    out.push_str(&format!("  Explanation:    {explained}\n"));
    out.push_str(&format!("  Graph:          {graph}\n"));
    out.push_str(&format!("  Conversation:   {} message(s)\n", session.conversation.len()));
    out.push_str(&format!("  Updated:        {updated}\n"));
    out
}
