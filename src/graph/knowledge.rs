//! Term co-occurrence knowledge graph with LLM-backed answering.

use crate::error::{Error, Result};
use crate::graph::chunker::LineChunker;
use crate::graph::persist::{persist_graph, GraphStats};
use crate::graph::schema::{open_in_memory, open_or_create};
use crate::graph::terms::query_terms;
use crate::graph::GraphQa;
use crate::llm::{ChatMessage, ChatModel, SYSTEM_INSTRUCTION};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

const NEIGHBORS_PER_SEED: i64 = 5;
const NEIGHBOR_WEIGHT: f64 = 0.5;

/// Chunk selected as context for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub score: f64,
}

/// What the graph found for one question.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub seed_terms: Vec<String>,
    pub related_terms: Vec<String>,
    pub chunks: Vec<RetrievedChunk>,
}

pub struct KnowledgeGraph<'a> {
    conn: Connection,
    model: &'a dyn ChatModel,
    chunker: LineChunker,
    top_k: usize,
    last_stats: Option<GraphStats>,
}

impl<'a> KnowledgeGraph<'a> {
    /// Graph kept in memory, or in `db_path` when given.
    pub fn open(model: &'a dyn ChatModel, db_path: Option<&Path>) -> Result<Self> {
        let conn = match db_path {
            Some(path) => open_or_create(path)?,
            None => open_in_memory()?,
        };
        Ok(Self { conn, model, chunker: LineChunker::default(), top_k: 6, last_stats: None })
    }

    pub fn chunking(mut self, max_tokens: usize, overlap_tokens: usize) -> Self {
        self.chunker = LineChunker::new(max_tokens, overlap_tokens);
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn stats(&self) -> Option<GraphStats> {
        self.last_stats
    }

    /// Pick the chunks most relevant to `question`.
    ///
    /// Question terms found in the graph are seeds; their strongest
    /// co-occurring terms join at reduced weight. Chunks score by
    /// `weight * mentions * idf` summed over those terms. When nothing
    /// matches, the first chunks of the aggregate are used.
    pub fn retrieve(&self, question: &str) -> Result<Retrieval> {
        if self.last_stats.is_none() {
            return Err(Error::GraphNotReady);
        }

        let total_chunks: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        if total_chunks == 0 {
            return Ok(Retrieval::default());
        }

        let mut weights: HashMap<String, f64> = HashMap::new();
        let mut seed_terms = Vec::new();
        for term in query_terms(question) {
            let known: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM term_mentions WHERE term = ?1",
                params![term],
                |row| row.get(0),
            )?;
            if known > 0 {
                weights.insert(term.clone(), 1.0);
                seed_terms.push(term);
            }
        }

        let mut related_terms = Vec::new();
        for seed in &seed_terms {
            for neighbor in self.neighbors(seed)? {
                if !weights.contains_key(&neighbor) {
                    weights.insert(neighbor.clone(), NEIGHBOR_WEIGHT);
                    related_terms.push(neighbor);
                }
            }
        }

        let mut scores: HashMap<String, f64> = HashMap::new();
        for (term, weight) in &weights {
            let mut stmt =
                self.conn.prepare_cached("SELECT chunk_id, count FROM term_mentions WHERE term = ?1")?;
            let rows: Vec<(String, i64)> = stmt
                .query_map(params![term], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            let df = rows.len() as f64;
            let idf = (1.0 + total_chunks as f64 / df.max(1.0)).ln();
            for (chunk_id, count) in rows {
                *scores.entry(chunk_id).or_insert(0.0) += weight * count as f64 * idf;
            }
        }

        let chunks = if scores.is_empty() {
            self.leading_chunks()?
        } else {
            self.top_scored_chunks(scores)?
        };
        tracing::debug!(
            "retrieved {} chunk(s) for {} seed and {} related term(s)",
            chunks.len(),
            seed_terms.len(),
            related_terms.len()
        );
        Ok(Retrieval { seed_terms, related_terms, chunks })
    }

    fn neighbors(&self, term: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT other, weight FROM (
                SELECT target AS other, weight FROM term_edges WHERE source = ?1
                UNION ALL
                SELECT source AS other, weight FROM term_edges WHERE target = ?1
            )
            ORDER BY weight DESC, other ASC
            LIMIT ?2
            ",
        )?;
        let rows = stmt
            .query_map(params![term, NEIGHBORS_PER_SEED], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn top_scored_chunks(&self, scores: HashMap<String, f64>) -> Result<Vec<RetrievedChunk>> {
        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.top_k);

        let mut out = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            let (ord, mut chunk) = self.conn.query_row(
                "SELECT ord, id, start_line, end_line, content FROM chunks WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        RetrievedChunk {
                            id: row.get(1)?,
                            start_line: row.get::<_, i64>(2)? as usize,
                            end_line: row.get::<_, i64>(3)? as usize,
                            content: row.get(4)?,
                            score: 0.0,
                        },
                    ))
                },
            )?;
            chunk.score = score;
            out.push((ord, chunk));
        }
        // Present context in aggregate order so code reads top to bottom.
        out.sort_by_key(|(ord, _)| *ord);
        Ok(out.into_iter().map(|(_, c)| c).collect())
    }

    fn leading_chunks(&self) -> Result<Vec<RetrievedChunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_line, end_line, content FROM chunks ORDER BY ord LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![self.top_k as i64], |row| {
                Ok(RetrievedChunk {
                    id: row.get(0)?,
                    start_line: row.get::<_, i64>(1)? as usize,
                    end_line: row.get::<_, i64>(2)? as usize,
                    content: row.get(3)?,
                    score: 0.0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl GraphQa for KnowledgeGraph<'_> {
    fn ingest(&mut self, text: &str) -> Result<GraphStats> {
        let chunks = self.chunker.chunk(text);
        let stats = persist_graph(&mut self.conn, &chunks)?;
        tracing::info!(
            "knowledge graph: {} chunks, {} terms, {} edges",
            stats.chunks,
            stats.terms,
            stats.edges
        );
        self.last_stats = Some(stats);
        Ok(stats)
    }

    fn query(&self, question: &str) -> Result<String> {
        let retrieval = self.retrieve(question)?;
        let prompt = build_question_prompt(question, &retrieval);
        let messages = [ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(prompt)];
        Ok(self.model.complete(&messages)?)
    }

    fn is_ready(&self) -> bool {
        self.last_stats.is_some()
    }
}

fn build_question_prompt(question: &str, retrieval: &Retrieval) -> String {
    let mut prompt = String::from(
        "Answer the question about the code base using only the context below. \
         If the context is not sufficient, say so.\n",
    );
    if !retrieval.seed_terms.is_empty() || !retrieval.related_terms.is_empty() {
        let mut concepts = retrieval.seed_terms.clone();
        concepts.extend(retrieval.related_terms.iter().cloned());
        prompt.push_str(&format!("\nRelated concepts: {}\n", concepts.join(", ")));
    }
    prompt.push_str("\nContext:\n");
    if retrieval.chunks.is_empty() {
        prompt.push_str("(no code was ingested)\n");
    }
    for chunk in &retrieval.chunks {
        prompt.push_str(&format!("--- lines {}-{} ---\n", chunk.start_line, chunk.end_line));
        prompt.push_str(&chunk.content);
        if !chunk.content.ends_with('\n') {
            prompt.push('\n');
        }
    }
    prompt.push_str(&format!("\nQuestion: {question}\n"));
    prompt
}
