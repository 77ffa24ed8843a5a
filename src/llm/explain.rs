//! Repository explanation: truncated aggregate text in, Markdown out.

use super::{ChatMessage, ChatModel, SYSTEM_INSTRUCTION};
use crate::domain::DEFAULT_EXPLAIN_MAX_CHARS;
use crate::error::LlmError;
use crate::utils::truncate_chars;

/// Markdown summary produced for one aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub markdown: String,
    /// Characters of code text that were sent.
    pub chars_sent: usize,
    /// `true` when the aggregate was longer than the prefix limit.
    pub truncated: bool,
}

pub struct Explainer<'a> {
    model: &'a dyn ChatModel,
    max_chars: usize,
}

impl<'a> Explainer<'a> {
    pub fn new(model: &'a dyn ChatModel) -> Self {
        Self { model, max_chars: DEFAULT_EXPLAIN_MAX_CHARS }
    }

    pub fn max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// One request: system instruction plus `prompt_prefix` followed by the
    /// first `max_chars` characters of `code_text`. Content past the limit is
    /// never seen by the model.
    pub fn explain(&self, prompt_prefix: &str, code_text: &str) -> Result<Explanation, LlmError> {
        let prefix = truncate_chars(code_text, self.max_chars);
        let chars_sent = prefix.chars().count();
        let truncated = prefix.len() < code_text.len();
        if truncated {
            tracing::info!(
                "explaining first {} of {} chars with {}",
                chars_sent,
                code_text.chars().count(),
                self.model.name()
            );
        }

        let messages = [
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(format!("{prompt_prefix}{prefix}")),
        ];
        let markdown = self.model.complete(&messages)?;
        Ok(Explanation { markdown, chars_sent, truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::RecordingModel;
    use crate::llm::Role;

    #[test]
    fn long_aggregate_is_cut_to_prefix() {
        let model = RecordingModel::replying("# Summary");
        let text = "a".repeat(20_000);

        let out = Explainer::new(&model).explain("Explain:\n", &text).expect("explain");
        assert_eq!(out.markdown, "# Summary");
        assert!(out.truncated);
        assert_eq!(out.chars_sent, 16_000);

        let sent = model.last_user_message().expect("user message");
        assert_eq!(sent, format!("Explain:\n{}", "a".repeat(16_000)));
    }

    #[test]
    fn system_instruction_is_fixed() {
        let model = RecordingModel::replying("ok");
        Explainer::new(&model).explain("p", "code").expect("explain");
        let requests = model.requests.borrow();
        assert_eq!(requests[0][0].role, Role::System);
        assert_eq!(requests[0][0].content, "You are a helpful assistant");
        assert_eq!(requests[0][1].content, "pcode");
    }

    #[test]
    fn limit_is_configurable() {
        let model = RecordingModel::replying("ok");
        let out = Explainer::new(&model).max_chars(3).explain("", "héllo").expect("explain");
        assert_eq!(model.last_user_message().as_deref(), Some("hél"));
        assert_eq!(out.chars_sent, 3);
    }

    #[test]
    fn short_text_is_sent_whole() {
        let model = RecordingModel::replying("ok");
        let out = Explainer::new(&model).explain("", "short").expect("explain");
        assert!(!out.truncated);
    }

    #[test]
    fn backend_failure_is_returned_not_raised() {
        let model = RecordingModel::failing("connection refused");
        let err = Explainer::new(&model).explain("", "x").expect_err("llm error");
        assert!(err.to_string().contains("connection refused"));
    }
}
