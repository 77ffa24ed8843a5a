//! Ask command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::utils::spinner;
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::Config;
use crate::graph::KnowledgeGraph;
use crate::llm::{ChatModel, OpenAiChat};
use crate::pipeline::ask;
use crate::session::Session;

#[derive(Args)]
pub struct AskArgs {
    /// Natural-language question about the fetched or uploaded code
    #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Chat model name
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Number of code chunks given to the model as context
    #[arg(short = 'k', long, value_name = "N")]
    pub top_k: Option<usize>,

    /// Keep the knowledge graph in this SQLite file instead of memory
    #[arg(long, value_name = "FILE")]
    pub graph_db: Option<PathBuf>,
}

pub fn run(args: AskArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.settings(&CliOverrides {
        llm_model: args.model.clone(),
        graph_top_k: args.top_k,
        ..CliOverrides::default()
    })?;
    let session = global.session_store()?.load();
    let question = args.question.join(" ");

    let model = OpenAiChat::from_config(&config)?;
    let answer = answer_question(&session, &model, &config, args.graph_db.as_deref(), &question)?;
    println!("{answer}");
    Ok(())
}

/// Re-ingest the session's combined text and answer one question.
pub fn answer_question(
    session: &Session,
    model: &dyn ChatModel,
    config: &Config,
    graph_db: Option<&Path>,
    question: &str,
) -> Result<String> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Question is empty");
    }
    let mut graph = KnowledgeGraph::open(model, graph_db)?
        .chunking(config.graph_chunk_tokens, config.graph_chunk_overlap)
        .top_k(config.graph_top_k);

    let progress = spinner("Thinking");
    let answer = ask(session, &mut graph, question);
    progress.finish_and_clear();
    if let Some(stats) = graph.stats() {
        tracing::debug!(
            "answered over {} chunk(s), {} term(s), {} edge(s)",
            stats.chunks,
            stats.terms,
            stats.edges
        );
    }
    answer.context("Failed to answer the question")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::testing::RecordingModel;

    #[test]
    fn unbuilt_graph_is_reported() {
        let session = Session { repo_text: "x = 1\n".into(), ..Session::default() };
        let model = RecordingModel::replying("unused");
        let err = answer_question(&session, &model, &Config::default(), None, "what is x?")
            .expect_err("graph not ready");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::GraphNotReady)));
        assert!(model.requests.borrow().is_empty());
    }

    #[test]
    fn answers_from_session_text() {
        let session = Session {
            repo_text: "def parse_config(path):\n    return load(path)\n".into(),
            graph_ready: true,
            ..Session::default()
        };
        let model = RecordingModel::replying("It loads the file.");
        let answer =
            answer_question(&session, &model, &Config::default(), None, "  What does parse_config do? ")
                .expect("answer");
        assert_eq!(answer, "It loads the file.");
        let prompt = model.last_user_message().expect("prompt");
        assert!(prompt.contains("Question: What does parse_config do?"));
    }
}
