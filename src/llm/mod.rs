//! Chat-completion backends, the repository explainer and image generation.

use crate::error::LlmError;
use serde::{Deserialize, Serialize};

pub mod explain;
pub mod image;
pub mod openai;

pub use explain::{Explainer, Explanation};
pub use image::ImageClient;
pub use openai::OpenAiChat;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Single-turn text-in, text-out completion.
pub trait ChatModel {
    fn name(&self) -> &str;
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}
