//! Term extraction: identifiers and their snake/camel-case parts become graph nodes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "has", "have",
        "how", "what", "when", "where", "which", "who", "why", "does", "this", "that", "with",
        "from", "into", "there", "their", "then", "than", "them", "these", "those", "was",
        "were", "will", "would", "should", "could", "about", "also", "its", "our", "your",
        // Keywords common across languages
        "def", "class", "return", "import", "self", "none", "true", "false", "pub", "let",
        "mut", "use", "mod", "impl", "struct", "enum", "const", "static", "else", "elif",
        "while", "loop", "match", "async", "await", "var", "function", "new", "null", "void",
        "int", "str", "string", "bool", "lambda", "pass", "yield", "try", "except", "finally",
        "raise", "with", "print",
    ]
    .into_iter()
    .collect()
});

const MIN_TERM_LEN: usize = 3;

/// Count of each term in `text`, lowercased, stopwords removed.
///
/// Compound identifiers contribute themselves plus their parts, so
/// `refreshToken` yields `refreshtoken`, `refresh` and `token`.
pub fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for m in IDENT_RE.find_iter(text) {
        let ident = m.as_str();
        let parts = split_identifier(ident);
        let whole = ident.trim_matches('_').to_ascii_lowercase();
        if parts.len() > 1 {
            for part in parts {
                bump(&mut counts, part);
            }
        }
        bump(&mut counts, whole);
    }
    counts
}

/// Distinct terms in `text`, in order of first appearance.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in IDENT_RE.find_iter(text) {
        let ident = m.as_str();
        let mut candidates = vec![ident.trim_matches('_').to_ascii_lowercase()];
        let parts = split_identifier(ident);
        if parts.len() > 1 {
            candidates.extend(parts);
        }
        for term in candidates {
            if is_term(&term) && seen.insert(term.clone()) {
                out.push(term);
            }
        }
    }
    out
}

fn bump(counts: &mut BTreeMap<String, usize>, term: String) {
    if is_term(&term) {
        *counts.entry(term).or_insert(0) += 1;
    }
}

fn is_term(term: &str) -> bool {
    term.len() >= MIN_TERM_LEN
        && !STOPWORDS.contains(term)
        && !term.chars().all(|c| c.is_ascii_digit() || c == '_')
}

/// Split on underscores and lower-to-upper case transitions.
fn split_identifier(ident: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for piece in ident.split('_').filter(|p| !p.is_empty()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for ch in piece.chars() {
            if ch.is_ascii_uppercase() && prev_lower && !current.is_empty() {
                parts.push(current.to_ascii_lowercase());
                current.clear();
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            current.push(ch);
        }
        if !current.is_empty() {
            parts.push(current.to_ascii_lowercase());
        }
    }
    parts
}
