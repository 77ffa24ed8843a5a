//! repo-explain: download a repository, explain it with an LLM and ask
//! follow-up questions over a code knowledge graph.

use std::process::ExitCode;

fn main() -> ExitCode {
    match repo_explain::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
