//! Response models for the document generation API
//!
//! The request body is [`docfill_core::GenerationRequest`].

use docfill_core::GeneratedDocument;
use serde::Serialize;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub reference_number: String,
    pub word_document: String,
    pub pdf_document: String,
}

impl From<GeneratedDocument> for GenerateResponse {
    fn from(document: GeneratedDocument) -> Self {
        Self {
            status: STATUS_SUCCESS,
            reference_number: document.reference_number,
            word_document: document.word_document,
            pdf_document: document.pdf_document,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}
