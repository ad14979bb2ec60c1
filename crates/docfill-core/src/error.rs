use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocfillError {
    #[error("Invalid template type!")]
    InvalidTemplateType(String),

    #[error("Placeholder '{0}' not found in the document.")]
    MarkerNotFound(String),

    #[error("Error inserting image: {0}")]
    ImageInsertion(String),

    #[error("Invalid signature image: {0}")]
    ImageDecode(String),

    #[error("Corrupt serial state in {path}: {reason}")]
    SerialState { path: PathBuf, reason: String },

    #[error("Document format error: {0}")]
    DocumentFormat(String),

    #[error("Word document not found at {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocfillError {
    /// True for errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, DocfillError::InvalidTemplateType(_))
    }
}
