//! Interactive session driven by terminal prompts.

use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use std::io::IsTerminal;
use std::path::PathBuf;

use super::ask::answer_question;
use super::explain::explain_and_index;
use super::fetch::fetch_into_session;
use super::image::generate_image;
use super::talk::talk;
use super::utils::{parse_csv, print_heading, print_soft_error};
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::Config;
use crate::llm::OpenAiChat;
use crate::pipeline::{load_uploads, FetchReport, Storage, GREETING};
use crate::session::{Session, SessionStore, SourceMode};
use crate::upload::UploadedFile;

#[derive(Args)]
pub struct ChatArgs {
    /// Chat model name
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Keep the knowledge graph in this SQLite file instead of memory
    #[arg(long, value_name = "FILE")]
    pub graph_db: Option<PathBuf>,
}

enum Action {
    Repository,
    Upload,
    Ask,
    ShowExplanation,
    Talk,
    Image,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keep {
    Temporary,
    Directory,
    Memory,
}

/// Where a downloaded repository is kept, as offered in the prompt.
const STORAGE_CHOICES: [(&str, Keep); 3] = [
    ("Save temporarily (zip only)", Keep::Temporary),
    ("Save to a directory", Keep::Directory),
    ("Keep in memory only", Keep::Memory),
];

/// Sessions that kept files before start on the temporary zip.
fn default_keep(session: &Session) -> usize {
    let wanted = if session.save_locally { Keep::Temporary } else { Keep::Memory };
    STORAGE_CHOICES.iter().position(|(_, keep)| *keep == wanted).unwrap_or(0)
}

fn temp_archive_notice(storage: &Storage, report: &FetchReport) -> Option<String> {
    match (storage, &report.archive_path) {
        (Storage::Temporary, Some(zip)) => Some(format!("Download your files from {}", zip.display())),
        _ => None,
    }
}

pub fn run(args: ChatArgs, global: &GlobalArgs) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("chat needs an interactive terminal; use fetch, explain and ask instead");
    }
    let config =
        global.settings(&CliOverrides { llm_model: args.model.clone(), ..CliOverrides::default() })?;
    let store = global.session_store()?;
    let mut session = store.load();
    let model = OpenAiChat::from_config(&config)?;
    let companion = OpenAiChat::conversational(&config)?;
    let theme = ColorfulTheme::default();

    println!("{}", style("repo-explain").bold().cyan());
    loop {
        let action = choose_action(&theme, &session)?;
        let outcome = match action {
            Action::Repository => repository_round(&theme, &mut session, &config)
                .and_then(|()| explain_round(&mut session, &model, &config, &args, &store)),
            Action::Upload => upload_round(&theme, &mut session, &config)
                .and_then(|()| explain_round(&mut session, &model, &config, &args, &store)),
            Action::Ask => {
                let question: String =
                    Input::with_theme(&theme).with_prompt("Question").interact_text()?;
                answer_question(&session, &model, &config, args.graph_db.as_deref(), &question)
                    .map(|answer| println!("\n{answer}\n"))
            }
            Action::ShowExplanation => {
                match &session.last_explanation {
                    Some(text) => {
                        print_heading("Explanation");
                        println!("{text}");
                    }
                    None => println!("No explanation yet."),
                }
                Ok(())
            }
            Action::Talk => talk_round(&theme, &mut session, &companion)
                .and_then(|()| store.save(&session)),
            Action::Image => {
                let prompt: String =
                    Input::with_theme(&theme).with_prompt("Image prompt").interact_text()?;
                generate_image(&config, &prompt, None)
                    .map(|path| println!("Saved image to {}", style(path.display()).green()))
            }
            Action::Quit => break,
        };
        if let Err(e) = outcome {
            print_soft_error("action failed", &format!("{e:#}"));
        }
    }
    store.save(&session)
}

fn choose_action(theme: &ColorfulTheme, session: &Session) -> Result<Action> {
    let mut items =
        vec![("Download repository", Action::Repository), ("Upload files", Action::Upload)];
    // Questions only make sense once a graph exists.
    if session.graph_ready {
        items.push(("Ask a question", Action::Ask));
    }
    if session.last_explanation.is_some() {
        items.push(("Show last explanation", Action::ShowExplanation));
    }
    items.push(("Free-form chat", Action::Talk));
    items.push(("Generate an image", Action::Image));
    items.push(("Quit", Action::Quit));

    let default = if session.graph_ready { 2 } else { 0 };
    let labels: Vec<&str> = items.iter().map(|(label, _)| *label).collect();
    let selection = Select::with_theme(theme)
        .with_prompt("What next?")
        .default(default)
        .items(&labels)
        .interact()?;
    Ok(items.swap_remove(selection).1)
}

fn repository_round(theme: &ColorfulTheme, session: &mut Session, config: &Config) -> Result<()> {
    session.owner = Input::with_theme(theme)
        .with_prompt("Owner")
        .with_initial_text(session.owner.clone())
        .interact_text()?;
    session.repo = Input::with_theme(theme)
        .with_prompt("Repository")
        .with_initial_text(session.repo.clone())
        .interact_text()?;
    let branch_default = config.branch.clone().unwrap_or_else(|| session.branch.clone());
    session.branch = Input::with_theme(theme)
        .with_prompt("Branch")
        .default(branch_default)
        .interact_text()?;
    let token: String = Password::with_theme(theme)
        .with_prompt("Token (empty for none)")
        .allow_empty_password(true)
        .interact()?;
    session.token =
        Some(token).filter(|t| !t.trim().is_empty()).or_else(|| config.github_token.clone());

    let labels: Vec<&str> = STORAGE_CHOICES.iter().map(|(label, _)| *label).collect();
    let choice = Select::with_theme(theme)
        .with_prompt("Keep the downloaded files?")
        .default(default_keep(session))
        .items(&labels)
        .interact()?;
    let storage = match STORAGE_CHOICES[choice].1 {
        Keep::Temporary => Storage::Temporary,
        Keep::Directory => {
            let dir: String = Input::with_theme(theme)
                .with_prompt("Directory")
                .default(session.repo.clone())
                .interact_text()?;
            let archive = Confirm::with_theme(theme)
                .with_prompt("Also create a zip archive?")
                .default(false)
                .interact()?;
            Storage::Directory { path: PathBuf::from(dir), archive }
        }
        Keep::Memory => Storage::None,
    };

    let report = fetch_into_session(session, config, &storage)?;
    if let Some(notice) = temp_archive_notice(&storage, &report) {
        println!("{}", style(notice).green());
    }
    Ok(())
}

fn upload_round(theme: &ColorfulTheme, session: &mut Session, config: &Config) -> Result<()> {
    let raw: String = Input::with_theme(theme)
        .with_prompt(format!("Files ({}), comma-separated", config.upload_extensions.join(", ")))
        .interact_text()?;
    let paths = parse_csv(&Some(raw)).unwrap_or_default();
    if paths.is_empty() {
        anyhow::bail!("No files given");
    }
    let files = paths
        .iter()
        .map(|p| UploadedFile::from_path(&PathBuf::from(p)))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let count = load_uploads(session, &files, &config.upload_extensions)?;
    println!("Loaded {count} file(s)");
    Ok(())
}

/// Free-form conversation until an empty line.
fn talk_round(theme: &ColorfulTheme, session: &mut Session, model: &OpenAiChat) -> Result<()> {
    match session.conversation.last() {
        Some(last) => println!("{}", style(&last.content).dim()),
        None => println!("{}", style(GREETING).cyan()),
    }
    loop {
        let message: String = Input::with_theme(theme)
            .with_prompt("You (empty line to stop)")
            .allow_empty(true)
            .interact_text()?;
        if message.trim().is_empty() {
            return Ok(());
        }
        let reply = talk(session, model, &message)?;
        println!("{}\n", reply);
    }
}

fn explain_round(
    session: &mut Session,
    model: &OpenAiChat,
    config: &Config,
    args: &ChatArgs,
    store: &SessionStore,
) -> Result<()> {
    let source = match session.mode {
        SourceMode::Repository => session.coordinate().slug(),
        SourceMode::Upload => "uploaded files".to_string(),
    };
    println!("Explaining {}", style(source).green());
    explain_and_index(session, model, config, args.graph_db.as_deref(), true)?;
    store.save(session)?;
    println!("{}", style("You can now ask questions about the code.").dim());
    Ok(())
}
