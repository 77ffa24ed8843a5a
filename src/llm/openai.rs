//! OpenAI-compatible `/chat/completions` backend.

use super::{ChatMessage, ChatModel};
use crate::domain::Config;
use crate::error::LlmError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChat {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiChat {
    /// A missing or blank key is accepted here and reported by the first call.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string),
            model: model.to_string(),
            temperature,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            &config.llm_base_url,
            config.llm_api_key.as_deref(),
            &config.llm_model,
            config.llm_temperature,
            Duration::from_secs(config.llm_timeout_secs),
        )
    }

    /// Same endpoint and model, sampled at `chat_temperature` for free-form talk.
    pub fn conversational(config: &Config) -> Result<Self, LlmError> {
        let mut chat = Self::from_config(config)?;
        chat.temperature = config.chat_temperature;
        Ok(chat)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        &self.model
    }

    fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let request =
            CompletionRequest { model: &self.model, temperature: self.temperature, messages };
        tracing::debug!(
            "chat completion: model={} messages={} timeout={:?}",
            self.model,
            messages.len(),
            self.timeout
        );

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let body = resp.text().map_err(|e| LlmError::Transport(e.to_string()))?;
        first_choice(&body)
    }
}

/// Content of the first choice of a completion response body.
fn first_choice(body: &str) -> Result<String, LlmError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Transport(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_choice_is_returned() {
        let body = r#"{"id":"x","choices":[
            {"index":0,"message":{"role":"assistant","content":"first"}},
            {"index":1,"message":{"role":"assistant","content":"second"}}
        ]}"#;
        assert_eq!(first_choice(body).expect("choice"), "first");
    }

    #[test]
    fn empty_choices_is_an_error() {
        assert!(matches!(first_choice(r#"{"choices":[]}"#), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn request_serializes_lowercase_roles() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let req = CompletionRequest { model: "m", temperature: 0.5, messages: &messages };
        let json = serde_json::to_value(&req).expect("json");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn configured_timeout_is_honoured() {
        let config = Config { llm_timeout_secs: 15, ..Config::default() };
        let chat = OpenAiChat::from_config(&config).expect("client");
        assert_eq!(chat.timeout, Duration::from_secs(15));
    }

    #[test]
    fn conversation_uses_its_own_temperature() {
        let config = Config { llm_temperature: 0.2, chat_temperature: 0.9, ..Config::default() };
        assert_eq!(OpenAiChat::from_config(&config).expect("client").temperature, 0.2);
        assert_eq!(OpenAiChat::conversational(&config).expect("client").temperature, 0.9);
    }

    #[test]
    fn blank_api_key_fails_at_call_time() {
        let chat = OpenAiChat::new("https://x/", Some("  "), "m", 0.0, Duration::from_secs(1))
            .expect("client");
        assert_eq!(chat.endpoint(), "https://x/chat/completions");
        let err = chat.complete(&[ChatMessage::user("hi")]);
        assert!(matches!(err, Err(LlmError::MissingApiKey)));
    }
}
