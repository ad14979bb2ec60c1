//! HTTP handlers for the document generation API

use std::io::ErrorKind;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use docfill_core::GenerationRequest;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::{GenerateResponse, HealthResponse};
use crate::state::AppState;

/// Service description
pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "Document Generation API is running!",
        "endpoints": {
            "POST /generate-document": "Generate a document with placeholders",
            "GET /download/<filename>": "Download a generated document",
        }
    }))
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docfill-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Fill a template and convert it to PDF
pub async fn generate_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    tracing::debug!(
        "Generation requested for {:?} with {} placeholders",
        request.template_type,
        request.placeholders.len()
    );

    // Template parsing, file I/O and the office converter all block
    let worker = Arc::clone(&state);
    let document = tokio::task::spawn_blocking(move || worker.generator.generate(request))
        .await
        .map_err(|e| anyhow::anyhow!("generation task failed: {}", e))??;

    Ok(Json(document.into()))
}

/// Serve a generated file as an attachment
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::FileNotFound(filename));
    }

    let path = state.output_dir().join(&filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ApiError::FileNotFound(filename)),
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ApiError::FileNotFound(filename)),
        Err(e) => return Err(anyhow::Error::from(e).into()),
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;

    tracing::info!("Serving {} ({} bytes)", filename, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, content_type(&filename).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename.replace('"', "'")),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// A single path component inside the output directory
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// MIME type by file extension
pub fn content_type(name: &str) -> &'static str {
    let extension = FsPath::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
