//! Explain command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::fetch::{fetch_from, github_client, RepoArgs, StorageArgs};
use super::utils::{format_with_commas, parse_csv, print_heading, print_soft_error, spinner};
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::{normalize_extension, Config};
use crate::fetch::HostingApi;
use crate::graph::{GraphStats, KnowledgeGraph};
use crate::llm::{ChatModel, Explainer, OpenAiChat};
use crate::pipeline::{build_graph, explain, load_uploads, Storage};
use crate::session::Session;
use crate::upload::UploadedFile;

#[derive(Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub storage: StorageArgs,

    /// Explain these local files instead of a repository (.py and .ipynb by default)
    #[arg(short, long, value_name = "FILE", num_args = 1.., conflicts_with_all = ["owner", "repo"])]
    pub upload: Vec<PathBuf>,

    /// Accepted upload extensions (comma-separated)
    #[arg(long, value_name = "EXTS")]
    pub allow_ext: Option<String>,

    /// Text placed before the code in the explanation request
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Characters of code sent for explanation
    #[arg(long, value_name = "N")]
    pub max_chars: Option<usize>,

    /// Chat model name
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Keep the knowledge graph in this SQLite file instead of memory
    #[arg(long, value_name = "FILE")]
    pub graph_db: Option<PathBuf>,

    /// Explain only; leave the knowledge graph untouched
    #[arg(long)]
    pub no_graph: bool,
}

pub fn run(args: ExplainArgs, global: &GlobalArgs) -> Result<()> {
    let mut config = global.settings(&CliOverrides {
        branch: args.repo.branch.clone(),
        github_token: args.repo.token.clone(),
        llm_model: args.model.clone(),
        explain_max_chars: args.max_chars,
        explain_prompt: args.prompt.clone(),
        ..CliOverrides::default()
    })?;
    if let Some(exts) = parse_csv(&args.allow_ext) {
        config.upload_extensions = exts.iter().map(|e| normalize_extension(e)).collect();
    }
    let store = global.session_store()?;
    let mut session = store.load();
    let model = OpenAiChat::from_config(&config)?;
    let graph_db = args.graph_db.as_deref();
    let with_graph = !args.no_graph;

    if !args.upload.is_empty() {
        let files = read_uploads(&args.upload)?;
        let count = load_uploads(&mut session, &files, &config.upload_extensions)?;
        eprintln!("Loaded {count} uploaded file(s)");
        store.save(&session)?;
    } else if args.repo.is_given() {
        args.repo.apply(&mut session, &config)?;
        let client = github_client(&config)?;
        let outcome = explain_repository(
            &mut session,
            &client,
            &model,
            &config,
            &args.storage.storage(),
            graph_db,
            with_graph,
        );
        store.save(&session)?;
        outcome?;
        return Ok(());
    } else if session.active_text().is_empty() {
        anyhow::bail!("Nothing to explain: pass --owner and --repo, or --upload FILE");
    }

    let outcome = explain_and_index(&mut session, &model, &config, graph_db, with_graph);
    store.save(&session)?;
    outcome.map(|_| ())
}

/// Fetch the session's repository from `api`, then explain and index it.
/// Nothing reaches the model or the graph unless the fetch succeeds.
pub fn explain_repository(
    session: &mut Session,
    api: &dyn HostingApi,
    model: &dyn ChatModel,
    config: &Config,
    storage: &Storage,
    graph_db: Option<&Path>,
    with_graph: bool,
) -> Result<Option<GraphStats>> {
    fetch_from(session, api, config, storage)?;
    explain_and_index(session, model, config, graph_db, with_graph)
}

/// Explain the session's text, then (re)build its graph. A failed
/// explanation is reported and does not stop the graph build.
pub fn explain_and_index(
    session: &mut Session,
    model: &dyn ChatModel,
    config: &Config,
    graph_db: Option<&Path>,
    with_graph: bool,
) -> Result<Option<GraphStats>> {
    let explainer = Explainer::new(model).max_chars(config.explain_max_chars);
    let progress = spinner(format!("Explaining with {}", model.name()));
    let explained = explain(session, &explainer, &config.explain_prompt);
    progress.finish_and_clear();

    match explained {
        Ok(explanation) => {
            if explanation.truncated {
                eprintln!(
                    "Note: only the first {} characters were sent for explanation",
                    format_with_commas(explanation.chars_sent)
                );
            }
            print_heading("Explanation");
            println!("{}", explanation.markdown);
        }
        Err(e) => print_soft_error("explanation failed", &e),
    }

    if !with_graph {
        return Ok(None);
    }
    let mut graph = KnowledgeGraph::open(model, graph_db)?
        .chunking(config.graph_chunk_tokens, config.graph_chunk_overlap)
        .top_k(config.graph_top_k);
    let stats = build_graph(session, &mut graph).context("Failed to build the knowledge graph")?;
    eprintln!(
        "Knowledge graph ready: {} chunk(s), {} term(s), {} edge(s)",
        stats.chunks, stats.terms, stats.edges
    );
    Ok(Some(stats))
}

fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| {
            UploadedFile::from_path(path)
                .with_context(|| format!("Failed reading upload {}", path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeEntry;
    use crate::error::Error;
    use crate::fetch::testing::FakeHost;
    use crate::llm::testing::RecordingModel;
    use tempfile::TempDir;

    fn octocat() -> Session {
        Session { owner: "octocat".into(), repo: "hello-world".into(), ..Session::default() }
    }

    #[test]
    fn missing_repository_reaches_neither_model_nor_graph() {
        let tmp = TempDir::new().expect("tmp");
        let graph_db = tmp.path().join("graph.sqlite");
        let mut session = octocat();
        let host = FakeHost::new().fail_listing("", 404);
        let model = RecordingModel::replying("never sent");

        let err = explain_repository(
            &mut session,
            &host,
            &model,
            &Config::default(),
            &Storage::None,
            Some(&graph_db),
            true,
        )
        .expect_err("404 aborts");
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Remote { status: 404, .. })));
        assert!(model.requests.borrow().is_empty());
        assert!(!graph_db.exists());
        assert!(!session.graph_ready);
        assert!(session.last_explanation.is_none());
    }

    #[test]
    fn fetched_repository_is_explained_and_indexed() {
        let mut session = octocat();
        let host = FakeHost::new()
            .dir("", vec![TreeEntry::file("app.py")])
            .file("app.py", "def serve(port):\n    return port\n");
        let model = RecordingModel::replying("Serves things.");

        let stats = explain_repository(
            &mut session,
            &host,
            &model,
            &Config::default(),
            &Storage::None,
            None,
            true,
        )
        .expect("explained")
        .expect("graph");
        assert_eq!(stats.chunks, 1);
        assert_eq!(model.requests.borrow().len(), 1);
        assert_eq!(session.last_explanation.as_deref(), Some("Serves things."));
        assert!(session.graph_ready);
    }

    #[test]
    fn failed_explanation_still_builds_graph() {
        let mut session = Session { repo_text: "def handler(event):\n    pass\n".into(), ..Session::default() };
        let model = RecordingModel::failing("quota exceeded");
        let stats = explain_and_index(&mut session, &model, &Config::default(), None, true)
            .expect("graph is built")
            .expect("stats");
        assert_eq!(stats.chunks, 1);
        assert!(session.graph_ready);
        assert!(session.last_explanation.is_none());
    }

    #[test]
    fn truncated_code_is_sent() {
        let mut session = Session { repo_text: "a".repeat(50), ..Session::default() };
        let model = RecordingModel::replying("short");
        let config = Config { explain_max_chars: 10, explain_prompt: "P:".into(), ..Config::default() };
        explain_and_index(&mut session, &model, &config, None, false).expect("explain");
        assert_eq!(model.last_user_message().as_deref(), Some("P:aaaaaaaaaa"));
        assert_eq!(session.last_explanation.as_deref(), Some("short"));
        assert!(!session.graph_ready);
    }
}
