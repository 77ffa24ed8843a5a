//! Session actions: fetch or upload, explain, build the graph, answer questions,
//! and free-form conversation.
//!
//! Every action takes the [`Session`] explicitly. A source is fully fetched
//! and aggregated (or the action fails) before the explainer or the graph is
//! touched, and a failed action leaves the session's texts unchanged.

use crate::domain::FetchLimits;
use crate::error::{Error, LlmError, Result};
use crate::fetch::{FetchStats, HostingApi, TreeFetcher};
use crate::graph::{GraphQa, GraphStats};
use crate::llm::{ChatMessage, ChatModel, Explainer, Explanation, SYSTEM_INSTRUCTION};
use crate::persist::{archive_to_sibling, LocalMirror};
use crate::session::{Session, SourceMode};
use crate::upload::{check_allowed, decode_all, UploadedFile};
use std::path::PathBuf;

/// Where fetched files go besides memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Aggregate in memory only.
    None,
    /// Mirror into a temporary directory and archive it to `<tmp>.zip`.
    Temporary,
    /// Mirror into a caller-chosen directory, optionally archiving it.
    Directory { path: PathBuf, archive: bool },
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub stats: FetchStats,
    pub aggregate_bytes: usize,
    /// Set for persistent mirrors; temporary ones are gone by the time this is returned.
    pub mirror_root: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
}

/// Fetch the session's repository and store its aggregate as `repo_text`.
pub fn fetch_repository(
    session: &mut Session,
    api: &dyn HostingApi,
    limits: FetchLimits,
    storage: &Storage,
    on_file: impl FnMut(&str),
) -> Result<FetchReport> {
    let coord = session.coordinate();
    let mirror = match storage {
        Storage::None => None,
        Storage::Temporary => Some(LocalMirror::temporary(&format!("{}-{}", coord.owner, coord.name))?),
        Storage::Directory { path, .. } => Some(LocalMirror::persistent(path)?),
    };

    let outcome = TreeFetcher::new(api)
        .limits(limits)
        .mirror_to(mirror.as_ref().map(|m| m.root()))
        .on_file(on_file)
        .fetch(&coord, "")?;

    let wants_archive = match storage {
        Storage::None => false,
        Storage::Temporary => true,
        Storage::Directory { archive, .. } => *archive,
    };
    let archive_path = match (&mirror, wants_archive) {
        (Some(m), true) => Some(archive_to_sibling(m.root())?),
        _ => None,
    };
    let mirror_root = mirror.as_ref().filter(|m| !m.is_temp()).map(|m| m.root().to_path_buf());

    session.mode = SourceMode::Repository;
    session.save_locally = !matches!(storage, Storage::None);
    session.repo_text = outcome.text;
    session.graph_ready = false;
    session.touch();

    Ok(FetchReport {
        stats: outcome.stats,
        aggregate_bytes: session.repo_text.len(),
        mirror_root,
        archive_path,
    })
}

/// Decode uploads into `uploaded_text`. Every file is checked before any is decoded.
pub fn load_uploads(session: &mut Session, files: &[UploadedFile], allowed: &[String]) -> Result<usize> {
    for file in files {
        check_allowed(file, allowed)?;
    }
    let text = decode_all(files)?;
    session.mode = SourceMode::Upload;
    session.uploaded_text = text;
    session.graph_ready = false;
    session.touch();
    Ok(files.len())
}

/// Explain the current mode's aggregate. The error is returned, not raised,
/// so the caller can show it and carry on with graph construction.
pub fn explain(
    session: &mut Session,
    explainer: &Explainer<'_>,
    prompt_prefix: &str,
) -> std::result::Result<Explanation, LlmError> {
    let explanation = explainer.explain(prompt_prefix, session.active_text())?;
    session.last_explanation = Some(explanation.markdown.clone());
    session.touch();
    Ok(explanation)
}

/// (Re)build the graph from repository plus uploaded text.
pub fn build_graph(session: &mut Session, graph: &mut dyn GraphQa) -> Result<GraphStats> {
    let stats = graph.ingest(&session.combined_text())?;
    session.graph_ready = true;
    session.touch();
    Ok(stats)
}

/// Answer `question`, re-ingesting the combined text first so the graph
/// always reflects the current session.
pub fn ask(session: &Session, graph: &mut dyn GraphQa, question: &str) -> Result<String> {
    if !session.graph_ready {
        return Err(Error::GraphNotReady);
    }
    graph.ingest(&session.combined_text())?;
    graph.query(question)
}

/// Opening line of every new conversation.
pub const GREETING: &str = "How can I help you?";

/// Send `text` as the next turn of the session's conversation and return the reply.
///
/// The whole history goes to the model. On failure the history is unchanged.
pub fn converse(
    session: &mut Session,
    model: &dyn ChatModel,
    text: &str,
) -> std::result::Result<String, LlmError> {
    let mut history = session.conversation.clone();
    if history.is_empty() {
        history.push(ChatMessage::assistant(GREETING));
    }
    history.push(ChatMessage::user(text));

    let mut request = Vec::with_capacity(history.len() + 1);
    request.push(ChatMessage::system(SYSTEM_INSTRUCTION));
    request.extend(history.iter().cloned());
    let reply = model.complete(&request)?;

    history.push(ChatMessage::assistant(reply.clone()));
    session.conversation = history;
    session.touch();
    Ok(reply)
}

pub fn reset_conversation(session: &mut Session) {
    session.conversation.clear();
    session.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeEntry;
    use crate::fetch::testing::FakeHost;
    use crate::graph::KnowledgeGraph;
    use crate::llm::testing::RecordingModel;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Graph double that records what it was given.
    #[derive(Default)]
    struct RecordingGraph {
        ingested: Vec<String>,
        questions: RefCell<Vec<String>>,
    }

    impl GraphQa for RecordingGraph {
        fn ingest(&mut self, text: &str) -> Result<GraphStats> {
            self.ingested.push(text.to_string());
            Ok(GraphStats { chunks: 1, terms: 0, edges: 0 })
        }

        fn query(&self, question: &str) -> Result<String> {
            self.questions.borrow_mut().push(question.to_string());
            Ok(format!("answer to {question}"))
        }

        fn is_ready(&self) -> bool {
            !self.ingested.is_empty()
        }
    }

    fn hello_world_session() -> Session {
        Session { owner: "octocat".into(), repo: "hello-world".into(), ..Session::default() }
    }

    fn hello_world_host() -> FakeHost {
        FakeHost::new().dir("", vec![TreeEntry::file("README.md")]).file("README.md", "Hi")
    }

    #[test]
    fn fetch_into_directory_mirrors_and_archives() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().join("hello-world");
        let mut session = hello_world_session();
        let storage = Storage::Directory { path: root.clone(), archive: true };

        let report = fetch_repository(
            &mut session,
            &hello_world_host(),
            FetchLimits::default(),
            &storage,
            |_| {},
        )
        .expect("fetch");

        assert_eq!(session.repo_text, "Hi\n");
        assert!(session.save_locally);
        assert_eq!(fs::read_to_string(root.join("README.md")).expect("mirror"), "Hi");
        assert_eq!(report.mirror_root.as_deref(), Some(root.as_path()));
        let archive = report.archive_path.expect("archive");
        let parent = fs::canonicalize(tmp.path()).expect("canonical tmp");
        assert_eq!(archive, parent.join("hello-world.zip"));
        let zip = zip::ZipArchive::new(Cursor::new(fs::read(&archive).expect("read zip")))
            .expect("valid zip");
        assert_eq!(zip.len(), 1);
    }

    #[test]
    fn temporary_storage_is_released_but_archive_kept() {
        let mut session = hello_world_session();
        let report = fetch_repository(
            &mut session,
            &hello_world_host(),
            FetchLimits::default(),
            &Storage::Temporary,
            |_| {},
        )
        .expect("fetch");

        assert!(report.mirror_root.is_none());
        let archive = report.archive_path.expect("archive");
        assert!(archive.is_file());
        let mirror_dir = archive.with_extension("");
        assert!(!mirror_dir.exists());
        fs::remove_file(archive).expect("cleanup");
    }

    #[test]
    fn failed_fetch_leaves_session_untouched() {
        let mut session = hello_world_session();
        session.repo_text = "previous\n".into();
        session.graph_ready = true;
        let host = FakeHost::new().fail_listing("", 404);

        let result =
            fetch_repository(&mut session, &host, FetchLimits::default(), &Storage::None, |_| {});
        assert!(matches!(result, Err(Error::Remote { status: 404, .. })));
        assert_eq!(session.repo_text, "previous\n");
        assert!(session.graph_ready);
        assert!(session.updated_at.is_none());
    }

    #[test]
    fn uploads_set_upload_mode_and_text() {
        let mut session = Session::default();
        let files = [UploadedFile::new("a.py", "x=1"), UploadedFile::new("b.py", "y=2")];
        let allowed = vec!["py".to_string(), "ipynb".to_string()];
        assert_eq!(load_uploads(&mut session, &files, &allowed).expect("upload"), 2);
        assert_eq!(session.mode, SourceMode::Upload);
        assert_eq!(session.uploaded_text, "x=1\ny=2\n");
        assert_eq!(session.active_text(), "x=1\ny=2\n");
    }

    #[test]
    fn disallowed_upload_decodes_nothing() {
        let mut session = Session::default();
        let files = [UploadedFile::new("a.py", "x=1"), UploadedFile::new("notes.txt", "n")];
        let err = load_uploads(&mut session, &files, &["py".to_string()]).expect_err("txt");
        assert!(matches!(err, Error::UnsupportedUpload { .. }));
        assert!(session.uploaded_text.is_empty());
    }

    #[test]
    fn explain_records_last_explanation() {
        let mut session = Session { repo_text: "fn main() {}\n".into(), ..Session::default() };
        let model = RecordingModel::replying("## Overview");
        let explainer = Explainer::new(&model);

        let out = explain(&mut session, &explainer, "Explain:\n").expect("explain");
        assert_eq!(out.markdown, "## Overview");
        assert_eq!(session.last_explanation.as_deref(), Some("## Overview"));
        assert_eq!(model.last_user_message().as_deref(), Some("Explain:\nfn main() {}\n"));
    }

    #[test]
    fn explain_failure_is_soft() {
        let mut session = Session { repo_text: "x\n".into(), ..Session::default() };
        let model = RecordingModel::failing("rate limited");
        let err = explain(&mut session, &Explainer::new(&model), "").expect_err("soft failure");
        assert!(err.to_string().contains("rate limited"));
        assert!(session.last_explanation.is_none());
    }

    #[test]
    fn ask_requires_graph_and_reingests_combined_text() {
        let mut session = Session {
            repo_text: "repo\n".into(),
            uploaded_text: "upload\n".into(),
            ..Session::default()
        };
        let mut graph = RecordingGraph::default();
        assert!(matches!(ask(&session, &mut graph, "q"), Err(Error::GraphNotReady)));

        build_graph(&mut session, &mut graph).expect("build");
        assert!(session.graph_ready);

        let answer = ask(&session, &mut graph, "what?").expect("ask");
        assert_eq!(answer, "answer to what?");
        assert_eq!(graph.ingested, vec!["repo\nupload\n", "repo\nupload\n"]);
    }

    #[test]
    fn end_to_end_with_knowledge_graph() {
        let mut session = hello_world_session();
        let host = FakeHost::new()
            .dir("", vec![TreeEntry::file("auth.py")])
            .file("auth.py", "def refresh_token(user):\n    return user.renew()\n");
        fetch_repository(&mut session, &host, FetchLimits::default(), &Storage::None, |_| {})
            .expect("fetch");

        let model = RecordingModel::replying("It renews the user.");
        let mut graph = KnowledgeGraph::open(&model, None).expect("graph");
        build_graph(&mut session, &mut graph).expect("build");

        let answer = ask(&session, &mut graph, "What does refresh_token do?").expect("ask");
        assert_eq!(answer, "It renews the user.");
        assert!(model.last_user_message().expect("prompt").contains("user.renew()"));
    }

    #[test]
    fn conversation_sends_full_history() {
        let mut session = Session { repo_text: "untouched\n".into(), ..Session::default() };
        let model = RecordingModel::replying("Hello there");

        assert_eq!(converse(&mut session, &model, "hi").expect("first"), "Hello there");
        converse(&mut session, &model, "and again").expect("second");

        let requests = model.requests.borrow();
        assert_eq!(requests[0].len(), 3);
        assert_eq!(requests[0][1], ChatMessage::assistant(GREETING));
        let second = &requests[1];
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(second[2], ChatMessage::user("hi"));
        assert_eq!(second[4], ChatMessage::user("and again"));

        assert_eq!(session.conversation.len(), 5);
        assert_eq!(session.repo_text, "untouched\n");
        assert!(!session.graph_ready);
    }

    #[test]
    fn failed_turn_keeps_history() {
        let mut session = Session::default();
        converse(&mut session, &RecordingModel::replying("one"), "first").expect("ok");
        let before = session.conversation.clone();

        let err = converse(&mut session, &RecordingModel::failing("down"), "second");
        assert!(err.is_err());
        assert_eq!(session.conversation, before);

        reset_conversation(&mut session);
        assert!(session.conversation.is_empty());
    }
}
