//! Layering environment and CLI flags over the file config.

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;

/// Prefix for environment overrides, e.g. `REPO_EXPLAIN_LLM_MODEL`.
pub const ENV_PREFIX: &str = "REPO_EXPLAIN_";

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub branch: Option<String>,
    pub github_token: Option<String>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub explain_max_chars: Option<usize>,
    pub explain_prompt: Option<String>,
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub graph_top_k: Option<usize>,
}

/// Final config: file values, then `REPO_EXPLAIN_*`, then the well-known
/// `OPENAI_API_KEY` / `GITHUB_TOKEN` / `HF_TOKEN` for unset secrets, then CLI flags.
pub fn merge_cli_with_config(file_config: Config, cli: &CliOverrides) -> Result<Config> {
    let mut config = layer_environment(file_config, Env::prefixed(ENV_PREFIX))?;
    fill_secrets_from(&mut config, |key| std::env::var(key).ok());
    apply_cli(&mut config, cli);
    Ok(config)
}

fn layer_environment(config: Config, env: Env) -> Result<Config> {
    Figment::from(Serialized::defaults(config))
        .merge(env)
        .extract()
        .context("Invalid REPO_EXPLAIN_* environment setting")
}

fn fill_secrets_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if config.llm_api_key.is_none() {
        config.llm_api_key = non_blank("OPENAI_API_KEY");
    }
    if config.github_token.is_none() {
        config.github_token = non_blank("GITHUB_TOKEN");
    }
    if config.image_api_token.is_none() {
        config.image_api_token = non_blank("HF_TOKEN");
    }
}

fn apply_cli(config: &mut Config, cli: &CliOverrides) {
    if let Some(branch) = cli.branch.as_ref().filter(|b| !b.trim().is_empty()) {
        config.branch = Some(branch.trim().to_string());
    }
    if let Some(token) = cli.github_token.as_ref().filter(|t| !t.trim().is_empty()) {
        config.github_token = Some(token.clone());
    }
    if let Some(model) = &cli.llm_model {
        config.llm_model = model.clone();
    }
    if let Some(url) = &cli.llm_base_url {
        config.llm_base_url = url.clone();
    }
    if let Some(max_chars) = cli.explain_max_chars {
        config.explain_max_chars = max_chars;
    }
    if let Some(prompt) = &cli.explain_prompt {
        config.explain_prompt = prompt.clone();
    }
    if cli.max_depth.is_some() {
        config.max_depth = cli.max_depth;
    }
    if cli.max_files.is_some() {
        config.max_files = cli.max_files;
    }
    if let Some(top_k) = cli.graph_top_k {
        config.graph_top_k = top_k;
    }
}
