//! Graph persistence helpers.

use crate::error::Result;
use crate::graph::chunker::TextChunk;
use crate::graph::terms::term_counts;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashSet};

/// Only the most frequent terms of a chunk take part in co-occurrence edges.
const EDGE_TERMS_PER_CHUNK: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub chunks: usize,
    pub terms: usize,
    pub edges: usize,
}

/// Replace the stored graph with one built from `chunks`.
pub fn persist_graph(conn: &mut Connection, chunks: &[TextChunk]) -> Result<GraphStats> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM term_edges", [])?;
    tx.execute("DELETE FROM term_mentions", [])?;
    tx.execute("DELETE FROM chunks", [])?;

    let mut distinct_terms: HashSet<String> = HashSet::new();
    let mut edges: BTreeMap<(String, String), i64> = BTreeMap::new();

    for (ord, chunk) in chunks.iter().enumerate() {
        tx.execute(
            "INSERT OR REPLACE INTO chunks(id, ord, start_line, end_line, content) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![chunk.id, ord as i64, chunk.start_line as i64, chunk.end_line as i64, chunk.content],
        )?;

        let counts = term_counts(&chunk.content);
        for (term, count) in &counts {
            tx.execute(
                "INSERT OR REPLACE INTO term_mentions(term, chunk_id, count) VALUES(?1, ?2, ?3)",
                params![term, chunk.id, *count as i64],
            )?;
            distinct_terms.insert(term.clone());
        }

        let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top: Vec<&String> = ranked.into_iter().take(EDGE_TERMS_PER_CHUNK).map(|(t, _)| t).collect();
        for (i, a) in top.iter().enumerate() {
            for b in top.iter().skip(i + 1) {
                let key = if a < b { ((*a).clone(), (*b).clone()) } else { ((*b).clone(), (*a).clone()) };
                *edges.entry(key).or_insert(0) += 1;
            }
        }
    }

    for ((source, target), weight) in &edges {
        tx.execute(
            "INSERT OR REPLACE INTO term_edges(source, target, weight) VALUES(?1, ?2, ?3)",
            params![source, target, weight],
        )?;
    }

    tx.commit()?;
    Ok(GraphStats { chunks: chunks.len(), terms: distinct_terms.len(), edges: edges.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::chunker::LineChunker;
    use crate::graph::schema::open_in_memory;

    #[test]
    fn persist_records_mentions_and_edges() {
        let mut conn = open_in_memory().expect("open");
        let chunks = LineChunker::default().chunk("def refresh_token(user):\n    return user\n");
        let stats = persist_graph(&mut conn, &chunks).expect("persist");
        assert_eq!(stats.chunks, 1);
        assert!(stats.terms >= 3);
        assert!(stats.edges >= 1);

        let count: i64 = conn
            .query_row("SELECT count FROM term_mentions WHERE term = 'user'", [], |row| row.get(0))
            .expect("user mention");
        assert_eq!(count, 2);

        let weight: i64 = conn
            .query_row(
                "SELECT weight FROM term_edges WHERE source = 'refresh' AND target = 'token'",
                [],
                |row| row.get(0),
            )
            .expect("edge");
        assert_eq!(weight, 1);
    }

    #[test]
    fn persist_replaces_previous_graph() {
        let mut conn = open_in_memory().expect("open");
        let first = LineChunker::default().chunk("alpha_value = 1\n");
        persist_graph(&mut conn, &first).expect("first");
        let second = LineChunker::default().chunk("beta_value = 2\n");
        persist_graph(&mut conn, &second).expect("second");

        let alpha: i64 = conn
            .query_row("SELECT COUNT(*) FROM term_mentions WHERE term = 'alpha'", [], |row| row.get(0))
            .expect("count");
        assert_eq!(alpha, 0);
        let chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0)).expect("count");
        assert_eq!(chunks, 1);
    }
}
