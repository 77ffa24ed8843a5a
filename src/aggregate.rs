//! Aggregate text: every decoded file, newline-terminated, in discovery order.

use crate::error::{Error, Result};

/// Accumulates decoded file texts into one blob.
///
/// Each appended text is followed by exactly one `\n`, so the final length is
/// the sum of `text.len() + 1` over all files.
#[derive(Debug, Default)]
pub struct Aggregator {
    text: String,
    files: usize,
    max_bytes: Option<usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: Option<usize>) -> Self {
        Self { max_bytes, ..Self::default() }
    }

    /// Append one file's text. Fails without appending if the bound would be crossed.
    pub fn push(&mut self, text: &str) -> Result<()> {
        if let Some(limit) = self.max_bytes {
            let next = self.text.len() + text.len() + 1;
            if next > limit {
                return Err(Error::limit(format!(
                    "aggregate text would reach {next} bytes (max {limit})"
                )));
            }
        }
        self.text.push_str(text);
        self.text.push('\n');
        self.files += 1;
        Ok(())
    }

    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Join two aggregates (repository first, then uploads) for graph ingestion.
pub fn combine(repo_text: &str, uploaded_text: &str) -> String {
    let mut out = String::with_capacity(repo_text.len() + uploaded_text.len());
    out.push_str(repo_text);
    out.push_str(uploaded_text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_sum_of_texts_plus_newlines() {
        let texts = ["fn a() {}", "", "héllo"];
        let mut agg = Aggregator::new();
        for t in texts {
            agg.push(t).expect("push");
        }
        let expected: usize = texts.iter().map(|t| t.len() + 1).sum();
        assert_eq!(agg.len(), expected);
        assert_eq!(agg.file_count(), 3);
        assert_eq!(agg.into_text(), "fn a() {}\n\nhéllo\n");
    }

    #[test]
    fn bound_rejects_without_partial_append() {
        let mut agg = Aggregator::with_max_bytes(Some(6));
        agg.push("abc").expect("fits");
        let err = agg.push("de").expect_err("would exceed");
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert_eq!(agg.into_text(), "abc\n");
    }

    #[test]
    fn combine_keeps_repo_text_first() {
        assert_eq!(combine("a\n", "b\n"), "a\nb\n");
        assert_eq!(combine("", "b\n"), "b\n");
    }
}
