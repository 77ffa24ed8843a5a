//! Talk command: one turn of free-form conversation per invocation

use anyhow::{Context, Result};
use clap::Args;

use super::utils::spinner;
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::llm::{ChatModel, OpenAiChat, Role};
use crate::pipeline::{converse, reset_conversation};
use crate::session::Session;

#[derive(Args)]
pub struct TalkArgs {
    /// Message to send; omit with --reset or --history
    #[arg(value_name = "MESSAGE", num_args = 0.., required_unless_present_any = ["reset", "history"])]
    pub message: Vec<String>,

    /// Forget the conversation before sending
    #[arg(long)]
    pub reset: bool,

    /// Print the conversation so far
    #[arg(long)]
    pub history: bool,

    /// Chat model name
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,
}

pub fn run(args: TalkArgs, global: &GlobalArgs) -> Result<()> {
    let config =
        global.settings(&CliOverrides { llm_model: args.model.clone(), ..CliOverrides::default() })?;
    let store = global.session_store()?;
    let mut session = store.load();

    if args.reset {
        reset_conversation(&mut session);
        store.save(&session)?;
        eprintln!("Conversation cleared");
    }
    if args.history {
        print!("{}", transcript(&session));
    }

    let message = args.message.join(" ");
    if message.trim().is_empty() {
        return Ok(());
    }
    let model = OpenAiChat::conversational(&config)?;
    let reply = talk(&mut session, &model, &message);
    store.save(&session)?;
    println!("{}", reply?);
    Ok(())
}

/// One conversation turn behind a spinner.
pub fn talk(session: &mut Session, model: &dyn ChatModel, message: &str) -> Result<String> {
    let progress = spinner(format!("Waiting for {}", model.name()));
    let reply = converse(session, model, message.trim());
    progress.finish_and_clear();
    reply.context("Conversation turn failed")
}

fn transcript(session: &Session) -> String {
    if session.conversation.is_empty() {
        return "No conversation yet.\n".to_string();
    }
    let mut out = String::new();
    for msg in &session.conversation {
        let speaker = match msg.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => continue,
        };
        out.push_str(&format!("{speaker}: {}\n", msg.content));
    }
    out
}
