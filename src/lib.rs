//! repo-explain: explain a hosted repository with an LLM and answer follow-up
//! questions over a knowledge graph built from its code.
//!
//! The pipeline is sequential: fetch (or upload) into one aggregate text,
//! optionally mirror and archive it, send a prefix of it for explanation, and
//! ingest the full text into a term graph used to answer questions.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod llm;
pub mod persist;
pub mod pipeline;
pub mod session;
pub mod upload;
pub mod utils;

pub use error::{Error, LlmError, Result};
