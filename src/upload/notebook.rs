//! Jupyter notebook decoding: code cells only, in document order.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows the source as one string or as a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            CellSource::Text(s) => s.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

/// Concatenate the source of every `code` cell, each followed by `\n`.
pub fn extract_code_cells(name: &str, bytes: &[u8]) -> Result<String> {
    let notebook: Notebook =
        serde_json::from_slice(bytes).map_err(|e| Error::format(name, e.to_string()))?;

    let mut out = String::new();
    let mut code_cells = 0usize;
    for cell in notebook.cells.iter().filter(|c| c.cell_type == "code") {
        out.push_str(&cell.source.joined());
        out.push('\n');
        code_cells += 1;
    }
    tracing::debug!("{}: {} of {} cells are code", name, code_cells, notebook.cells.len());
    Ok(out)
}
