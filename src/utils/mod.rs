//! Shared helpers: text decoding, token estimation, hashing and paths.

pub mod encoding;
pub mod hashing;
pub mod paths;
pub mod tokens;

pub use encoding::{decode_utf8, truncate_chars};
pub use hashing::stable_hash;
pub use paths::{normalize_path, sanitize_relative_path};
pub use tokens::estimate_tokens;
