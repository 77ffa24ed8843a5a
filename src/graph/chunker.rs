//! Line-based chunking of aggregate text.

use crate::utils::{estimate_tokens, stable_hash};

/// A contiguous run of lines from the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

pub struct LineChunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Default for LineChunker {
    fn default() -> Self {
        Self::new(400, 40)
    }
}

impl LineChunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self { max_tokens: max_tokens.max(1), overlap_tokens }
    }

    pub fn chunk(&self, content: &str) -> Vec<TextChunk> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let total_tokens = estimate_tokens(content).max(1);
        let avg_tokens_per_line = (total_tokens / lines.len()).max(1);
        let target_lines = (self.max_tokens / avg_tokens_per_line).max(1);
        let overlap_lines = self.overlap_tokens / avg_tokens_per_line;

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < lines.len() {
            let mut end = (start + target_lines).min(lines.len());

            if end < lines.len() {
                let window_start = start + ((target_lines as f64 * 0.8) as usize);
                let search_start = window_start.min(end);
                let search_end = (end + 10).min(lines.len());
                if let Some(boundary) = find_boundary(&lines, search_start, search_end) {
                    end = boundary;
                }
            }

            if end <= start {
                end = (start + 1).min(lines.len());
            }

            let chunk_content = lines[start..end].join("");
            if !chunk_content.trim().is_empty() {
                chunks.push(TextChunk {
                    id: stable_hash(&chunk_content, start + 1, end),
                    start_line: start + 1,
                    end_line: end,
                    content: chunk_content,
                });
            }

            if end >= lines.len() {
                break;
            }
            let next_start = end.saturating_sub(overlap_lines);
            start = if next_start <= start { end } else { next_start };
        }

        chunks
    }
}

fn find_boundary(lines: &[&str], start: usize, end: usize) -> Option<usize> {
    let mut best_idx: Option<usize> = None;
    let mut best_weight: u32 = 0;

    for (idx, line) in lines.iter().enumerate().take(end).skip(start) {
        let trimmed = line.trim_start();
        let weight: u32 = if trimmed.starts_with("class ") {
            4
        } else if trimmed.starts_with("def ")
            || trimmed.starts_with("fn ")
            || trimmed.starts_with("pub fn ")
            || trimmed.starts_with("async fn ")
            || trimmed.starts_with("pub async fn ")
            || trimmed.starts_with("function ")
        {
            3
        } else if line.trim().is_empty() {
            1
        } else {
            0
        };

        if weight > best_weight {
            best_weight = weight;
            best_idx = Some(idx);
        }
    }

    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(LineChunker::default().chunk("").is_empty());
        assert!(LineChunker::default().chunk("\n\n   \n").is_empty());
    }

    #[test]
    fn small_text_is_one_chunk() {
        let chunks = LineChunker::default().chunk("x = 1\ny = 2\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[0].content, "x = 1\ny = 2\n");
    }

    #[test]
    fn long_text_splits_and_covers_every_line() {
        let text: String = (0..200).map(|i| format!("value_{i} = compute_{i}(input)\n")).collect();
        let chunks = LineChunker::new(50, 0).chunk(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.first().map(|c| c.start_line), Some(1));
        assert_eq!(chunks.last().map(|c| c.end_line), Some(200));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_line + 1, pair[1].start_line);
        }
    }

    #[test]
    fn prefers_definition_boundaries() {
        let mut text = String::new();
        for i in 0..30 {
            text.push_str(&format!("    statement_number_{i} = {i}\n"));
        }
        text.push_str("def next_function():\n");
        for i in 0..30 {
            text.push_str(&format!("    other_statement_{i} = {i}\n"));
        }
        let chunks = LineChunker::new(200, 0).chunk(&text);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().skip(1).any(|c| c.content.starts_with("def next_function")));
    }
}
