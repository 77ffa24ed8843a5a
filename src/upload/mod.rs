//! Decoding of user-supplied files into aggregate text.
//!
//! Notebooks (`.ipynb`) contribute their code cells; every other accepted file
//! is read as strict UTF-8 source text.

use crate::aggregate::Aggregator;
use crate::domain::normalize_extension;
use crate::error::{Error, Result};
use crate::utils::decode_utf8;
use std::path::Path;

pub mod notebook;

pub use notebook::extract_code_cells;

/// One uploaded file: display name plus raw content.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }

    /// Read a file from disk, naming it by its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default()
    }

    pub fn is_notebook(&self) -> bool {
        self.extension() == "ipynb"
    }
}

/// Decode one upload into text.
pub fn decode(file: &UploadedFile) -> Result<String> {
    if file.is_notebook() {
        extract_code_cells(&file.name, &file.bytes)
    } else {
        decode_utf8(&file.name, file.bytes.clone())
    }
}

/// Decode uploads in selection order, each followed by `\n`.
pub fn decode_all(files: &[UploadedFile]) -> Result<String> {
    let mut agg = Aggregator::new();
    for file in files {
        let text = decode(file)?;
        agg.push(&text)?;
    }
    tracing::info!("decoded {} uploaded file(s), {} bytes", agg.file_count(), agg.len());
    Ok(agg.into_text())
}

/// Reject uploads whose extension is not in `allowed` (normalized, no dot).
pub fn check_allowed(file: &UploadedFile, allowed: &[String]) -> Result<()> {
    let ext = file.extension();
    if allowed.iter().any(|a| normalize_extension(a) == ext) {
        return Ok(());
    }
    Err(Error::UnsupportedUpload {
        name: file.name.clone(),
        allowed: allowed.iter().map(|a| format!(".{a}")).collect::<Vec<_>>().join(", "),
    })
}
