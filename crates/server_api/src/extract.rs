//! PDF validation and text extraction.

use std::{
    io::Write,
    path::PathBuf,
    process::{Command, Output},
};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns the bytes of an uploaded PDF into plain text.
///
/// Implementations are called from the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError>;
}

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|kind| kind.mime_type() == "application/pdf")
}

/// Extracts text with poppler's `pdftotext`.
pub struct PdfToTextExtractor {
    binary: PathBuf,
}

impl Default for PdfToTextExtractor {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftotext"),
        }
    }
}

impl PdfToTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl TextExtractor for PdfToTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let mut staged = NamedTempFile::new()?;
        staged.write_all(pdf)?;
        staged.flush()?;

        let output = Command::new(&self.binary)
            .args(["-enc", "UTF-8"])
            .arg(staged.path())
            .arg("-")
            .output();
        let text = handle_cmd_output(output, "pdftotext (install poppler-utils)")?;
        Ok(text.trim().to_string())
    }
}

fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => Err(ExtractionError::ExtractionFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}
