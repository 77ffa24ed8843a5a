//! Stable hashing for graph chunk IDs

use sha2::{Digest, Sha256};

pub fn stable_hash(content: &str, start_line: usize, end_line: usize) -> String {
    // Only the first 1000 chars take part; slice on char boundaries.
    let content_prefix: String = content.chars().take(1000).collect();
    let hash_input = format!("{start_line}-{end_line}:{content_prefix}");
    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::stable_hash;

    #[test]
    fn hash_depends_on_line_range() {
        let a = stable_hash("fn main() {}", 1, 1);
        let b = stable_hash("fn main() {}", 2, 2);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert_eq!(a, stable_hash("fn main() {}", 1, 1));
    }
}
