//! Knowledge graph over aggregate text for follow-up questions.

use crate::error::Result;

pub mod chunker;
pub mod knowledge;
pub mod persist;
pub mod schema;
pub mod terms;

pub use knowledge::{KnowledgeGraph, Retrieval, RetrievedChunk};
pub use persist::GraphStats;

/// Ingest-then-answer question service.
pub trait GraphQa {
    /// Build the graph from `text`, replacing whatever was ingested before.
    fn ingest(&mut self, text: &str) -> Result<GraphStats>;

    /// Answer against the most recent ingestion.
    fn query(&self, question: &str) -> Result<String>;

    fn is_ready(&self) -> bool;
}
