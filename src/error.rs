//! Error types shared by the fetch, persist, upload, LLM and graph layers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Non-success HTTP response from the hosting API.
    #[error("Remote error {status} for {url}: {body}")]
    Remote { status: u16, url: String, body: String },

    #[error("File is not valid UTF-8: {path}")]
    Decode { path: String },

    #[error("Malformed notebook {name}: {reason}")]
    Format { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Graph store error: {0}")]
    Graph(#[from] rusqlite::Error),

    #[error("Knowledge graph has not been built yet; run an explain pass first")]
    GraphNotReady,

    #[error("Unsupported upload '{name}': allowed extensions are {allowed}")]
    UnsupportedUpload { name: String, allowed: String },
}

/// Failure of a chat completion call.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no choices")]
    EmptyResponse,

    #[error("missing API key (set OPENAI_API_KEY or llm_api_key)")]
    MissingApiKey,

    #[error("missing image API token (set HF_TOKEN or image_api_token)")]
    MissingImageToken,

    #[error("expected image bytes, got {content_type}: {body}")]
    NotAnImage { content_type: String, body: String },
}

impl Error {
    pub fn remote(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Remote { status, url: url.into(), body: body.into() }
    }

    pub fn format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format { name: name.into(), reason: reason.into() }
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }
}
