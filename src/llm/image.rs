//! Text-to-image inference endpoint (Hugging Face style: JSON prompt in, image bytes out).

use crate::domain::Config;
use crate::error::LlmError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    inputs: &'a str,
}

pub struct ImageClient {
    http: Client,
    url: String,
    token: Option<String>,
}

impl ImageClient {
    pub fn new(url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.to_string(),
            token: token.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            &config.image_api_url,
            config.image_api_token.as_deref(),
            Duration::from_secs(config.llm_timeout_secs),
        )
    }

    /// Generate one image for `prompt` and return its encoded bytes.
    pub fn generate(&self, prompt: &str) -> Result<Vec<u8>, LlmError> {
        let token = self.token.as_deref().ok_or(LlmError::MissingImageToken)?;
        tracing::debug!("image generation: {} ({} prompt chars)", self.url, prompt.chars().count());

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(&ImageRequest { inputs: prompt })
            .send()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().map_err(|e| LlmError::Transport(e.to_string()))?;
        check_image(&content_type, bytes.to_vec())
    }
}

/// Accept image bodies; anything else (typically a JSON error) is reported with its text.
fn check_image(content_type: &str, bytes: Vec<u8>) -> Result<Vec<u8>, LlmError> {
    if content_type.starts_with("image/") || sniff_extension(&bytes).is_some() {
        return Ok(bytes);
    }
    Err(LlmError::NotAnImage {
        content_type: if content_type.is_empty() { "no content type".into() } else { content_type.into() },
        body: String::from_utf8_lossy(&bytes).chars().take(200).collect(),
    })
}

/// File extension matching the image's magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [0xff, 0xd8, 0xff, ..] => Some("jpg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}
